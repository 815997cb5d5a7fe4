//! Generation query ordering.

use crate::types::{CollectionSelector, FieldReference, Order, StructuredQuery};

/// Supported sort fields for generation queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationSortField {
    /// Sort by last update (default, matches the dashboard)
    #[default]
    UpdatedAt,
    /// Sort by creation date
    CreatedAt,
    /// Sort by title (case-sensitive)
    Title,
}

impl GenerationSortField {
    /// Get the Firestore field path for this sort field.
    pub const fn firestore_field(&self) -> &'static str {
        match self {
            Self::UpdatedAt => "updatedAt",
            Self::CreatedAt => "createdAt",
            Self::Title => "title",
        }
    }
}

/// Sort direction for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    /// Get the Firestore direction string.
    pub const fn firestore_direction(&self) -> &'static str {
        match self {
            Self::Ascending => "ASCENDING",
            Self::Descending => "DESCENDING",
        }
    }
}

/// Complete sort configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortConfig {
    pub field: GenerationSortField,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(field: GenerationSortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

/// Upper bound on documents returned by one list query.
pub const MAX_LIST_LIMIT: u32 = 500;

/// Build an ordered query over one collection.
///
/// Documents lacking the sort field are excluded by Firestore itself.
pub fn build_sorted_query(collection_id: &str, sort: &SortConfig, limit: Option<u32>) -> StructuredQuery {
    StructuredQuery {
        from: vec![CollectionSelector {
            collection_id: collection_id.to_string(),
            all_descendants: None,
        }],
        order_by: vec![Order {
            field: FieldReference {
                field_path: sort.field.firestore_field().to_string(),
            },
            direction: sort.direction.firestore_direction().to_string(),
        }],
        limit: limit.map(|l| l.clamp(1, MAX_LIST_LIMIT) as i32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_sort_config() {
        let sort = SortConfig::new(GenerationSortField::Title, SortDirection::Ascending);
        let query = build_sorted_query("generations", &sort, Some(20));
        assert_eq!(query.order_by[0].field.field_path, "title");
        assert_eq!(query.order_by[0].direction, "ASCENDING");
        assert_eq!(query.limit, Some(20));
    }

    #[test]
    fn test_default_query_orders_by_updated_desc() {
        let query = build_sorted_query("generations", &SortConfig::default(), None);
        assert_eq!(query.from[0].collection_id, "generations");
        assert_eq!(query.order_by[0].field.field_path, "updatedAt");
        assert_eq!(query.order_by[0].direction, "DESCENDING");
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_limit_is_clamped() {
        let query = build_sorted_query("generations", &SortConfig::default(), Some(10_000));
        assert_eq!(query.limit, Some(MAX_LIST_LIMIT as i32));
        let query = build_sorted_query("generations", &SortConfig::default(), Some(0));
        assert_eq!(query.limit, Some(1));
    }
}
