//! Tests for categories module
//!
//! These tests verify:
//! - Slug generation
//! - Request and list query validation
//! - Service CRUD against an in-memory database

#[cfg(test)]
mod tests {
    use super::super::models::{
        CategoryListParams, CategoryListQuery, CategoryStatus, CreateCategoryRequest, SortBy,
        SortDir, UpdateCategoryRequest,
    };
    use super::super::services::slugify;
    use super::super::*;
    use crate::common::testing::test_pool;
    use crate::common::{ApiError, Validator};

    fn create_request(name: &str) -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: name.to_string(),
            slug: None,
            description: None,
            image_url: None,
            sort_order: None,
            status: None,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hot Drinks"), "hot-drinks");
        assert_eq!(slugify("  Snacks_and  Sweets "), "snacks-and-sweets");
        assert_eq!(slugify("Café & Bar!"), "caf-bar");
        assert_eq!(slugify("--Juice--"), "juice");
        assert_eq!(slugify("a---b"), "a-b");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_create_validation_success() {
        let mut request = create_request("Drinks");
        request.image_url = Some("https://cdn.example.com/drinks.png".to_string());
        request.sort_order = Some(3);
        request.status = Some("inactive".to_string());

        let result = request.validate(&request);
        assert!(result.is_valid, "Valid category should pass validation");
    }

    #[test]
    fn test_create_validation_failures() {
        let request = CreateCategoryRequest {
            name: "D".to_string(),
            slug: Some("x".to_string()),
            description: Some("d".repeat(2001)),
            image_url: Some("ftp://files/drinks.png".to_string()),
            sort_order: Some(-1),
            status: Some("archived".to_string()),
        };

        let result = request.validate(&request);
        assert!(!result.is_valid);
        for field in ["name", "slug", "description", "image_url", "sort_order", "status"] {
            assert!(
                result.errors.iter().any(|e| e.field == field),
                "expected an error for {}",
                field
            );
        }
    }

    #[test]
    fn test_update_validation_allows_clearing() {
        let request = UpdateCategoryRequest {
            description: Some(String::new()),
            image_url: Some("  ".to_string()),
            ..Default::default()
        };

        assert!(request.validate(&request).is_valid);
    }

    #[test]
    fn test_list_query_defaults() {
        let params = CategoryListQuery::default().into_params().unwrap();
        assert_eq!(params, CategoryListParams::default());
        assert_eq!(params.sort_by, SortBy::SortOrder);
        assert_eq!(params.sort_dir, SortDir::Asc);
    }

    #[test]
    fn test_list_query_rejects_out_of_range_values() {
        let query = CategoryListQuery {
            page: Some(0),
            page_size: Some(101),
            status: Some("deleted".to_string()),
            search: Some("s".repeat(256)),
            sort_by: Some("price".to_string()),
            sort_dir: Some("sideways".to_string()),
        };

        let errors = query.into_params().unwrap_err();
        let fields: Vec<&str> = errors.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["page", "page_size", "status", "search", "sort_by", "sort_dir"]
        );
    }

    #[test]
    fn test_list_query_rejects_page_past_addressable_offset() {
        let query = CategoryListQuery {
            page: Some(i64::MAX),
            page_size: Some(100),
            ..Default::default()
        };

        let errors = query.into_params().unwrap_err();
        let fields: Vec<&str> = errors.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["page"]);

        let last = CategoryListQuery {
            page: Some(i64::MAX / 100),
            page_size: Some(100),
            ..Default::default()
        };
        assert!(last.into_params().is_ok());
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_defaults() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        let mut request = create_request("  Hot Drinks ");
        request.description = Some("   ".to_string());
        let category = service.create(request).await.unwrap();

        assert!(category.id.starts_with("C_"));
        assert_eq!(category.name, "Hot Drinks");
        assert_eq!(category.slug, "hot-drinks");
        assert_eq!(category.status, CategoryStatus::Active);
        assert_eq!(category.sort_order, 0);
        assert!(category.description.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slugs_get_numeric_suffix() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        let first = service.create(create_request("Juice")).await.unwrap();
        let second = service.create(create_request("Juice")).await.unwrap();
        let mut explicit = create_request("Other");
        explicit.slug = Some("JUICE".to_string());
        let third = service.create(explicit).await.unwrap();

        assert_eq!(first.slug, "juice");
        assert_eq!(second.slug, "juice-2");
        assert_eq!(third.slug, "juice-3");
    }

    #[tokio::test]
    async fn test_slug_exhaustion_is_internal_error() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool.clone());

        service.create(create_request("Tea")).await.unwrap();
        for suffix in 2..=100 {
            let mut request = create_request("Tea");
            request.slug = Some(format!("tea-{}", suffix));
            service.create(request).await.unwrap();
        }

        let err = service.create(create_request("Tea")).await.unwrap_err();
        assert!(matches!(err, CategoryError::SlugUnavailable(_)));
        assert_eq!(ApiError::from(err).code(), "internal_error");
    }

    #[tokio::test]
    async fn test_unsluggable_name_is_rejected() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        let err = service.create(create_request("?!")).await.unwrap_err();
        assert!(matches!(err, CategoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_missing_category() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        let err = service.get_by_id("C_MISSING000").await.unwrap_err();
        assert!(matches!(err, CategoryError::NotFound));

        let api: ApiError = err.into();
        assert_eq!(api.code(), "category_not_found");
    }

    #[tokio::test]
    async fn test_update_partial_fields() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        let mut request = create_request("Coffee");
        request.description = Some("Freshly roasted".to_string());
        request.image_url = Some("https://cdn.example.com/coffee.png".to_string());
        let created = service.create(request).await.unwrap();

        let updated = service
            .update(
                &created.id,
                UpdateCategoryRequest {
                    sort_order: Some(7),
                    status: Some("inactive".to_string()),
                    description: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Coffee");
        assert_eq!(updated.slug, "coffee");
        assert_eq!(updated.sort_order, 7);
        assert_eq!(updated.status, CategoryStatus::Inactive);
        assert!(updated.description.is_none());
        assert_eq!(
            updated.image_url.as_deref(),
            Some("https://cdn.example.com/coffee.png")
        );

        let reloaded = service.get_by_id(&created.id).await.unwrap();
        assert_eq!(reloaded.sort_order, 7);
        assert!(reloaded.description.is_none());
    }

    #[tokio::test]
    async fn test_update_slug_conflict() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        service.create(create_request("Beer")).await.unwrap();
        let wine = service.create(create_request("Wine")).await.unwrap();

        let err = service
            .update(
                &wine.id,
                UpdateCategoryRequest {
                    slug: Some("Beer".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CategoryError::SlugAlreadyExists));

        // Re-submitting its own slug is not a conflict
        let same = service
            .update(
                &wine.id,
                UpdateCategoryRequest {
                    slug: Some("wine".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.slug, "wine");
    }

    #[tokio::test]
    async fn test_update_missing_category() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        let err = service
            .update("C_MISSING000", UpdateCategoryRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CategoryError::NotFound));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_category_and_frees_slug() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        let water = service.create(create_request("Water")).await.unwrap();
        service.delete(&water.id).await.unwrap();

        assert!(matches!(
            service.get_by_id(&water.id).await,
            Err(CategoryError::NotFound)
        ));
        assert!(matches!(
            service.delete(&water.id).await,
            Err(CategoryError::NotFound)
        ));

        let again = service.create(create_request("Water")).await.unwrap();
        assert_eq!(again.slug, "water");

        let page = service.list(&CategoryListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_list_pagination_filter_and_sort() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        for (name, order, status) in [
            ("Soda", 3, "active"),
            ("Milk", 1, "active"),
            ("Smoothie", 2, "inactive"),
            ("Sparkling Water", 4, "active"),
            ("Syrup", 5, "active"),
        ] {
            let mut request = create_request(name);
            request.sort_order = Some(order);
            request.status = Some(status.to_string());
            service.create(request).await.unwrap();
        }

        let first_page = service
            .list(&CategoryListParams {
                page_size: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first_page.total, 5);
        assert_eq!(first_page.total_pages, 3);
        let names: Vec<&str> = first_page.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Milk", "Smoothie"]);

        let last_page = service
            .list(&CategoryListParams {
                page: 3,
                page_size: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(last_page.items.len(), 1);
        assert_eq!(last_page.items[0].name, "Syrup");

        let active = service
            .list(&CategoryListParams {
                status: Some(CategoryStatus::Active),
                search: Some("s".to_string()),
                sort_by: SortBy::Name,
                sort_dir: SortDir::Desc,
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = active.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Syrup", "Sparkling Water", "Soda"]);
        assert_eq!(active.total, 3);
    }

    #[tokio::test]
    async fn test_list_empty() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);

        let page = service.list(&CategoryListParams::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn test_list_far_page_is_empty_not_a_panic() {
        let pool = test_pool().await;
        let service = CategoriesService::new(pool);
        service.create(create_request("Coffee")).await.unwrap();

        let params = CategoryListParams {
            page: i64::MAX,
            page_size: 100,
            ..Default::default()
        };
        assert_eq!(params.offset(), i64::MAX);

        let page = service.list(&params).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
    }
}
