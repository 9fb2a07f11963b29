use serde::{Deserialize, Serialize};

/// Menu grouping, addressed by numeric id and by a unique slug
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub title: String,
    pub slug: String,
}

/// Body for creating or replacing a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub title: String,
    pub slug: String,
}

impl Category {
    pub fn new(id: u64, request: CategoryRequest) -> Self {
        Self {
            id,
            title: request.title.trim().to_string(),
            slug: request.slug.trim().to_string(),
        }
    }

    /// Replace all writable fields, keeping the id
    pub fn apply(&mut self, request: CategoryRequest) {
        self.title = request.title.trim().to_string();
        self.slug = request.slug.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_new_trims_fields() {
        let category = Category::new(
            3,
            CategoryRequest {
                title: "  Desserts ".to_string(),
                slug: "desserts ".to_string(),
            },
        );

        assert_eq!(category.id, 3);
        assert_eq!(category.title, "Desserts");
        assert_eq!(category.slug, "desserts");
    }

    #[test]
    fn test_category_apply_keeps_id() {
        let mut category = Category::new(
            1,
            CategoryRequest {
                title: "Mains".to_string(),
                slug: "mains".to_string(),
            },
        );
        category.apply(CategoryRequest {
            title: "Main Courses".to_string(),
            slug: "main-courses".to_string(),
        });

        assert_eq!(category.id, 1);
        assert_eq!(category.slug, "main-courses");
    }
}
