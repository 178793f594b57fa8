// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crm_app::{RecordId, Row};
use crm_view::{Column, PAGE_SIZE, Selection, TableCommand, TableInput, TableView};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn table() -> TableView<Row> {
    TableView::new(
        "Accounts",
        "id".to_owned(),
        vec![
            Column::new("name".to_owned(), "Name"),
            Column::new("revenue".to_owned(), "Revenue"),
        ],
    )
}

fn sorted_ids(view: &mut TableView<Row>, data: &[Row], field: &str, times: usize) -> Vec<RecordId> {
    let selection = Selection::new();
    let input = TableInput::new(data, &selection);
    for _ in 0..times {
        view.apply(input, TableCommand::SortBy(field.to_owned()));
    }
    view.project(input).filtered_ids
}

proptest! {
    #[test]
    fn descending_is_reverse_of_ascending(names in prop::collection::btree_set("[a-z]{1,8}", 1..40)) {
        let data: Vec<Row> = names
            .iter()
            .enumerate()
            .map(|(index, name)| Row::new().with("id", index as i64).with("name", name.as_str()))
            .collect();
        let mut view = table();
        let ascending = sorted_ids(&mut view, &data, "name", 1);
        let descending = sorted_ids(&mut view, &data, "name", 1);

        let mut reversed = ascending.clone();
        reversed.reverse();
        prop_assert_eq!(descending, reversed);
        prop_assert_eq!(ascending.len(), data.len());
    }

    #[test]
    fn nulls_sort_last_in_both_directions(values in prop::collection::vec(prop::option::of(-1000i64..1000), 0..40)) {
        let data: Vec<Row> = values
            .iter()
            .enumerate()
            .map(|(index, value)| Row::new().with("id", index as i64).with("revenue", *value))
            .collect();
        let nulls: BTreeSet<RecordId> = values
            .iter()
            .enumerate()
            .filter(|(_, value)| value.is_none())
            .map(|(index, _)| RecordId::Int(index as i64))
            .collect();

        let mut view = table();
        for _ in 0..2 {
            let ids = sorted_ids(&mut view, &data, "revenue", 1);
            let first_null = ids.iter().position(|id| nulls.contains(id)).unwrap_or(ids.len());
            prop_assert!(ids[first_null..].iter().all(|id| nulls.contains(id)));
            prop_assert_eq!(ids.len() - first_null, nulls.len());
        }
    }

    #[test]
    fn pages_cover_every_filtered_row_once(count in 0usize..60, hops in 0usize..8) {
        let data: Vec<Row> = (0..count)
            .map(|index| Row::new().with("id", index as i64).with("name", format!("acct {index}")))
            .collect();
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = table();
        for _ in 0..hops {
            view.apply(input, TableCommand::NextPage);
        }
        let projection = view.project(input);
        prop_assert!(projection.page < projection.page_count.max(1));
        prop_assert!(projection.rows.len() <= PAGE_SIZE);
        let expected = count.saturating_sub(projection.page * PAGE_SIZE).min(PAGE_SIZE);
        prop_assert_eq!(projection.rows.len(), expected);
    }
}
