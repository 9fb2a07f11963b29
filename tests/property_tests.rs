use axum::http::{Method, StatusCode};
use proptest::prelude::*;
use restaurant_rs::models::{
    cart_total, parse_status_flag, validate_price, validate_quantity, validate_slug, CartLine,
    CartResponse, MenuItem, MenuItemRequest, OrderDraft, MAX_QUANTITY,
};
use rust_decimal::Decimal;
use serde_json::json;

mod common;
use common::*;

prop_compose! {
    fn arb_valid_price()(cents in 1u32..1_000_000) -> Decimal {
        Decimal::from_parts(cents, 0, 0, false, 2)
    }
}

prop_compose! {
    fn arb_cart_line()(menuitem_id in 1u64..500, price in arb_valid_price(), quantity in 1u32..50) -> CartLine {
        let menu_item = MenuItem::new(
            menuitem_id,
            MenuItemRequest {
                title: "Dish".to_string(),
                price,
                featured: false,
                category_id: 1,
            },
        );
        CartLine::new(7, &menu_item, quantity)
    }
}

proptest! {
    #[test]
    fn test_line_price_is_unit_price_times_quantity(line in arb_cart_line()) {
        prop_assert_eq!(line.price, line.unit_price * Decimal::from(line.quantity));
    }

    #[test]
    fn test_order_total_matches_cart(lines in prop::collection::vec(arb_cart_line(), 1..20)) {
        let expected = cart_total(&lines);
        let detail = OrderDraft::from_cart(7, lines.clone(), chrono::Utc::now()).materialize(1, 1);

        prop_assert_eq!(detail.order.total, expected);
        prop_assert_eq!(detail.items.len(), lines.len());
        let item_sum: Decimal = detail.items.iter().map(|item| item.price).sum();
        prop_assert_eq!(item_sum, expected);
    }

    #[test]
    fn test_cart_response_counts(lines in prop::collection::vec(arb_cart_line(), 0..20)) {
        let quantity: u32 = lines.iter().map(|line| line.quantity).sum();
        let response = CartResponse::from_lines(7, lines);
        prop_assert_eq!(response.total_items, quantity);
    }

    #[test]
    fn test_valid_prices_accepted(price in arb_valid_price()) {
        prop_assert!(validate_price("price", &price).is_ok());
    }

    #[test]
    fn test_prices_with_three_decimals_rejected(mills in 1u32..1_000_000) {
        let price = Decimal::from_parts(mills * 10 + 1, 0, 0, false, 3);
        prop_assert!(validate_price("price", &price).is_err());
    }

    #[test]
    fn test_quantity_bounds(quantity in 0u32..100_000) {
        let valid = (1..=MAX_QUANTITY).contains(&quantity);
        prop_assert_eq!(validate_quantity(quantity).is_ok(), valid);
    }

    #[test]
    fn test_slug_shape(slug in "[a-z0-9]+(-[a-z0-9]+)*") {
        prop_assume!(slug.len() <= 255);
        prop_assert!(validate_slug(&slug).is_ok());
    }

    #[test]
    fn test_status_flag_accepts_only_known_values(raw in "[a-z0-9]{0,6}") {
        let known = matches!(raw.as_str(), "true" | "false" | "1" | "0");
        prop_assert_eq!(parse_status_flag(&raw).is_ok(), known);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Whatever sequence of adds, the cart holds one row per menu item
    /// carrying the last quantity written
    #[test]
    fn test_cart_keeps_last_add_per_item(adds in prop::collection::vec((0usize..3, 1u32..20), 1..12)) {
        tokio_test::block_on(async {
            let env = TestEnvironment::new();
            env.grant(2, "Manager").await;
            let category = env.category(2, "Mains", "mains").await;
            let mut items = Vec::new();
            for (title, price) in [("Soup", "4.50"), ("Stew", "9.00"), ("Pie", "6.25")] {
                items.push(env.menu_item(2, title, price, category).await);
            }

            let mut expected = std::collections::BTreeMap::new();
            for (index, quantity) in &adds {
                let (status, _) = env
                    .post(
                        "/cart/add/",
                        As::User(3),
                        json!({ "menuitem_id": items[*index], "quantity": quantity }),
                    )
                    .await;
                assert_eq!(status, StatusCode::CREATED);
                expected.insert(items[*index], *quantity);
            }

            let (_, cart) = env.get("/cart/", As::User(3)).await;
            let rows = cart["items"].as_array().unwrap();
            assert_eq!(rows.len(), expected.len());
            for row in rows {
                let menuitem_id = row["menuitem_id"].as_u64().unwrap();
                assert_eq!(row["quantity"].as_u64().unwrap(), expected[&menuitem_id] as u64);
            }

            let (status, order) = env
                .send(Method::POST, "/orders/place/", As::User(3), None)
                .await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(order["total"], cart["total_price"]);
        });
    }
}
