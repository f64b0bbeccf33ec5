//! Property-based tests for the pure pieces of the crate.
//!
//! These use proptest to pin down invariants that single examples would
//! undersell: query strings never carrying blank filter values, urgency
//! matching being exactly trim-then-compare, and cache keys canonical under
//! parameter reordering.

use chrono::{NaiveDate, TimeZone, Utc};
use opsboard_client::cache::QueryKey;
use opsboard_client::models::{ReceivingFilters, ReceivingStatus, Requisition};
use opsboard_client::urgency::matches_pending;
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = ReceivingStatus> {
    prop_oneof![
        Just(ReceivingStatus::AwaitingConference),
        Just(ReceivingStatus::Conferred),
        Just(ReceivingStatus::Pending),
        Just(ReceivingStatus::Rejected),
        Just(ReceivingStatus::EntryRejected),
    ]
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2023i32..2027, 1u32..13, 1u32..29)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn requisition(order_number: String, fulfilled: bool) -> Requisition {
    Requisition {
        id: 1,
        obra: 510,
        sub_item: None,
        requested_by: "Planejamento".into(),
        order_number,
        material_description: "Cabo PP 3x2,5mm".into(),
        request_date: Utc.with_ymd_and_hms(2024, 6, 3, 11, 30, 0).unwrap(),
        is_fulfilled: fulfilled,
        receiving_id: None,
    }
}

// Property: absent or blank filters never reach the query string
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn filters_never_emit_blank_parameters(
        search in proptest::option::of("[a-z0-9 ]{0,10}"),
        status in proptest::option::of(status_strategy()),
        is_client in proptest::option::of(any::<bool>()),
        start_date in proptest::option::of(date_strategy()),
        page in 1u32..40,
    ) {
        let filters = ReceivingFilters {
            search: search.clone(),
            status,
            is_client_material: is_client,
            start_date,
            end_date: None,
            page,
        };
        let params = filters.to_query(10);

        prop_assert_eq!(params[0].0, "page");
        let page_str = page.to_string();
        prop_assert_eq!(params[0].1.as_str(), page_str.as_str());
        prop_assert_eq!(params[1].0, "page_size");
        for (key, value) in &params {
            prop_assert!(!value.trim().is_empty(), "blank value under '{}'", key);
        }

        let has = |name: &str| params.iter().any(|(key, _)| *key == name);
        let search_expected = search.as_deref().map(str::trim).is_some_and(|s| !s.is_empty());
        prop_assert_eq!(has("search"), search_expected);
        prop_assert_eq!(has("status"), status.is_some());
        prop_assert_eq!(has("is_client_material"), is_client.is_some());
        prop_assert_eq!(has("start_date"), start_date.is_some());
        prop_assert!(!has("end_date"));
    }

    #[test]
    fn status_filter_carries_the_wire_string(status in status_strategy()) {
        let filters = ReceivingFilters {
            status: Some(status),
            ..Default::default()
        };
        let params = filters.to_query(10);
        let value = params
            .iter()
            .find(|(key, _)| *key == "status")
            .map(|(_, value)| value.clone())
            .unwrap();
        prop_assert_eq!(value, status.to_string());
    }
}

// Property: urgency matching is trim-then-exact-compare
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn urgency_matching_trims_both_sides(
        base in "[A-Z]{2}-[0-9]{3,6}",
        record_pad in "[ ]{0,3}",
        left_pad in "[ ]{0,3}",
        right_pad in "[ ]{0,3}",
    ) {
        let pending = requisition(format!("{}{}{}", left_pad, base, right_pad), false);
        let padded = format!("{}{}", base, record_pad);
        prop_assert!(matches_pending(Some(padded.as_str()), std::slice::from_ref(&pending)));
    }

    #[test]
    fn zero_padding_is_not_normalized(number in "[1-9][0-9]{2,5}") {
        let pending = requisition(number.clone(), false);
        let zero_padded = format!("0{}", number);
        prop_assert!(!matches_pending(
            Some(zero_padded.as_str()),
            std::slice::from_ref(&pending)
        ));
    }

    #[test]
    fn fulfilled_requisitions_never_match(number in "[A-Z]{2}-[0-9]{3,6}") {
        let pending = requisition(number.clone(), true);
        prop_assert!(!matches_pending(Some(number.as_str()), std::slice::from_ref(&pending)));
    }
}

// Property: cache keys are canonical and prefix-safe
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn query_keys_ignore_parameter_order(
        search in "[a-z]{1,6}",
        status in "[a-z]{1,6}",
        page in 1u32..100,
    ) {
        let forward = QueryKey::list(
            "recebimentos",
            &[
                ("page", page.to_string()),
                ("search", search.clone()),
                ("status", status.clone()),
            ],
        );
        let reversed = QueryKey::list(
            "recebimentos",
            &[
                ("status", status),
                ("search", search),
                ("page", page.to_string()),
            ],
        );
        prop_assert_eq!(forward, reversed);
    }

    #[test]
    fn resource_prefixes_respect_the_separator(
        resource in "[a-z_]{2,10}",
        id in 1i64..10_000,
    ) {
        let key = QueryKey::detail(&resource, id);
        prop_assert!(key.matches_prefix(&resource));

        // A resource that extends the name is a different resource.
        let extended = format!("{}x", resource);
        prop_assert!(!key.matches_prefix(&extended));
        let other = QueryKey::detail(&extended, id);
        prop_assert!(!other.matches_prefix(&resource));
    }
}
