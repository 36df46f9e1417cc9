mod harness;

use std::sync::Arc;
use std::time::Instant;

use harness::{FakeGateway, connected_driver, drain, fixtures, session, session_with};

use tabula::app::action::Action;
use tabula::app::reducer::reduce;
use tabula::app::session::SessionSettings;
use tabula::app::state::AppState;
use tabula::app::tasks::{
    LoadOutcome, commit_cell_edits, create_table, list_tables, load_table, refresh_content,
    reload_all,
};
use tabula::domain::{
    CellEdit, ColumnValue, ContentPatch, EditId, FetchRequest, KeyValue, SortOrder,
};

fn replay(actions: Vec<Action>) -> AppState {
    let mut state = AppState::default();
    for action in actions {
        reduce(&mut state, action, Instant::now());
    }
    state
}

fn replaced_tables(actions: &[Action]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::ContentReplaced { content, .. } => Some(content.table_name.clone()),
            _ => None,
        })
        .collect()
}

mod overlapping_loads {
    use super::*;

    #[tokio::test]
    async fn later_table_wins_and_earlier_content_is_never_emitted() {
        let gateway = Arc::new(
            FakeGateway::new()
                .with_table("a", fixtures::users(3))
                .with_table("b", fixtures::orders()),
        );
        gateway.gate_content("a");
        let (session, mut rx) = session(Arc::clone(&gateway));

        let first = tokio::spawn(load_table(Arc::clone(&session), FetchRequest::new("a")));
        gateway.wait_parked("a").await;
        let second = load_table(Arc::clone(&session), FetchRequest::new("b")).await;
        let after_b = drain(&mut rx);
        gateway.release("a");
        let first = first.await.unwrap();
        let after_release = drain(&mut rx);

        assert_eq!(second, LoadOutcome::Completed);
        assert_eq!(first, LoadOutcome::Interrupted);
        assert_eq!(replaced_tables(&after_b), vec!["b"]);
        assert!(after_release.is_empty());

        let state = replay(after_b);
        assert_eq!(state.displayed_table(), Some("b"));
        assert!(!state.is_fetching);
    }

    #[tokio::test]
    async fn store_driven_reselect_ends_on_last_selection() {
        let gateway = Arc::new(
            FakeGateway::new()
                .with_table("a", fixtures::users(3))
                .with_table("b", fixtures::orders()),
        );
        let mut driver = connected_driver(Arc::clone(&gateway), SessionSettings::default()).await;

        driver.dispatch(Action::SelectTable("a".into()));
        driver.dispatch(Action::SelectTable("b".into()));
        driver.settle().await.unwrap();

        assert_eq!(driver.state.displayed_table(), Some("b"));
        assert_eq!(driver.state.selected_table.as_deref(), Some("b"));
    }
}

mod stable_order {
    use super::*;

    #[tokio::test]
    async fn first_primary_key_is_appended_after_caller_order() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(3)));
        let (session, mut rx) = session(Arc::clone(&gateway));

        let outcome = load_table(
            session,
            FetchRequest::new("users").with_order(vec![SortOrder::desc("name")]),
        )
        .await;

        assert_eq!(outcome, LoadOutcome::Completed);
        let state = replay(drain(&mut rx));
        let content = state.content.unwrap();
        assert_eq!(
            content.order,
            vec![SortOrder::desc("name"), SortOrder::asc("id")]
        );
        assert_eq!(content.cell(0, "name"), Some("user3"));
    }

    #[tokio::test]
    async fn table_without_primary_key_loads_unordered() {
        let gateway = Arc::new(FakeGateway::new().with_table("events", fixtures::events()));
        let (session, mut rx) = session(Arc::clone(&gateway));

        load_table(session, FetchRequest::new("events")).await;

        let state = replay(drain(&mut rx));
        let content = state.content.unwrap();
        assert!(content.order.is_empty());
        assert_eq!(content.rows.len(), 2);
        assert_eq!(gateway.count_calls("get_table_structure"), 1);
        assert_eq!(gateway.count_calls("get_table_content"), 1);
    }
}

mod table_creation {
    use super::*;

    #[tokio::test]
    async fn taken_names_resolve_to_next_free_suffix() {
        let gateway = Arc::new(FakeGateway::new().reserve_names(&["foo", "foo0", "foo1"]));
        let (session, mut rx) = session(Arc::clone(&gateway));

        let created = create_table(&session, "foo").await;

        assert_eq!(created, Ok("foo2".to_string()));
        assert_eq!(
            gateway.calls(),
            vec![
                "create_table:foo",
                "create_table:foo0",
                "create_table:foo1",
                "create_table:foo2"
            ]
        );
        assert_eq!(
            drain(&mut rx),
            vec![Action::TableCreated {
                name: "foo2".into()
            }]
        );
    }

    #[tokio::test]
    async fn created_table_is_listed_and_opened() {
        let gateway = Arc::new(FakeGateway::new().with_table("foo", fixtures::events()));
        let mut driver = connected_driver(Arc::clone(&gateway), SessionSettings::default()).await;

        driver
            .send(Action::CreateTable { base: "foo".into() })
            .await
            .unwrap();

        assert!(driver.state.registry.contains("foo0"));
        assert_eq!(driver.state.displayed_table(), Some("foo0"));
    }

    #[tokio::test]
    async fn exhausted_attempts_surface_an_error() {
        let gateway = Arc::new(FakeGateway::new().reserve_names(&["t", "t0"]));
        let settings = SessionSettings {
            max_create_attempts: 2,
            ..SessionSettings::default()
        };
        let (session, mut rx) = session_with(Arc::clone(&gateway), settings);

        let result = create_table(&session, "t").await;

        assert!(result.is_err());
        assert!(matches!(drain(&mut rx).as_slice(), [Action::ErrorCaught(_)]));
    }
}

mod table_list {
    use super::*;

    #[tokio::test]
    async fn empty_database_skips_oid_and_foreign_key_lookups() {
        let gateway = Arc::new(FakeGateway::new());
        let (session, mut rx) = session(Arc::clone(&gateway));

        let first = list_tables(&session).await;

        assert_eq!(first, Ok(String::new()));
        assert_eq!(gateway.calls(), vec!["get_tables"]);
        let state = replay(drain(&mut rx));
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn registry_carries_foreign_keys() {
        let gateway = Arc::new(
            FakeGateway::new()
                .with_table("orders", fixtures::orders())
                .with_table("users", fixtures::users(1)),
        );
        let driver = connected_driver(Arc::clone(&gateway), SessionSettings::default()).await;

        let orders = driver.state.registry.get("orders").unwrap();
        assert_eq!(orders.oid, Some(1000));
        assert_eq!(orders.foreign_keys[0].target(), "users.id");
    }

    #[tokio::test]
    async fn reload_restores_previous_page_and_order() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(250)));
        let (session, mut rx) = session(Arc::clone(&gateway));
        let request = FetchRequest::new("users")
            .with_page(3)
            .with_order(vec![SortOrder::desc("id")]);

        let outcome = reload_all(session, Some(request)).await;

        assert_eq!(outcome, Ok(Some(LoadOutcome::Completed)));
        let actions = drain(&mut rx);
        assert_eq!(actions[0], Action::TablesCleared);
        let state = replay(actions);
        let content = state.content.unwrap();
        assert_eq!(content.page, 3);
        assert_eq!(content.order, vec![SortOrder::desc("id")]);
        assert_eq!(content.cell(0, "id"), Some("50"));
    }
}

mod refresh {
    use super::*;

    #[tokio::test]
    async fn repeated_refresh_yields_identical_content() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(120)));
        let mut driver = connected_driver(Arc::clone(&gateway), SessionSettings::default()).await;
        driver
            .send(Action::SelectTable("users".into()))
            .await
            .unwrap();
        driver.send(Action::NextPage).await.unwrap();

        driver.send(Action::ReloadCurrentTable).await.unwrap();
        let once = driver.state.content.clone();
        driver.send(Action::ReloadCurrentTable).await.unwrap();
        let twice = driver.state.content.clone();

        assert_eq!(once, twice);
        assert_eq!(once.map(|c| c.page), Some(2));
    }

    #[tokio::test]
    async fn refresh_fetches_only_content() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(3)));
        let (session, mut rx) = session(Arc::clone(&gateway));

        refresh_content(session, FetchRequest::new("users")).await;

        assert_eq!(gateway.calls(), vec!["get_table_content:users"]);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [
                Action::FetchStarted { .. },
                Action::RowsReplaced { .. },
                Action::FetchStopped
            ]
        ));
    }
}

mod mutations {
    use super::*;

    #[tokio::test]
    async fn committed_edit_patches_content_without_reload() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(3)));
        let mut driver = connected_driver(Arc::clone(&gateway), SessionSettings::default()).await;
        driver
            .send(Action::SelectTable("users".into()))
            .await
            .unwrap();
        let loads = gateway.count_calls("get_table_content");

        driver.dispatch(Action::StageCellEdit {
            row_index: 1,
            column_key: "name".into(),
            value: Some("renamed".into()),
        });
        driver.send(Action::CommitEdits).await.unwrap();

        assert_eq!(gateway.count_calls("get_table_content"), loads);
        let content = driver.state.content.as_ref().unwrap();
        assert_eq!(content.cell(1, "name"), Some("renamed"));
        assert_eq!(
            gateway.table("users").unwrap().rows[1][1].as_deref(),
            Some("renamed")
        );
    }

    #[tokio::test]
    async fn commit_emits_exactly_the_returned_results() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(2)));
        let (session, mut rx) = session(Arc::clone(&gateway));
        let edits = vec![CellEdit {
            id: EditId(1),
            table_name: "users".into(),
            column_key: "email".into(),
            primary_key: vec![KeyValue::new("id", "2")],
            value: None,
        }];

        let results = commit_cell_edits(&session, edits).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].is_error());
        assert_eq!(
            drain(&mut rx),
            vec![Action::ContentPatched {
                table: "users".into(),
                patch: ContentPatch::Cells(results),
            }]
        );
    }

    #[tokio::test]
    async fn dropping_displayed_table_clears_content() {
        let gateway = Arc::new(
            FakeGateway::new()
                .with_table("users", fixtures::users(1))
                .with_table("orders", fixtures::orders()),
        );
        let mut driver = connected_driver(Arc::clone(&gateway), SessionSettings::default()).await;
        driver
            .send(Action::SelectTable("orders".into()))
            .await
            .unwrap();

        driver
            .send(Action::DropTable("orders".into()))
            .await
            .unwrap();

        assert!(driver.state.content.is_none());
        assert!(!driver.state.registry.contains("orders"));
    }

    #[tokio::test]
    async fn added_column_appears_in_displayed_structure() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(2)));
        let mut driver = connected_driver(Arc::clone(&gateway), SessionSettings::default()).await;
        driver
            .send(Action::SelectTable("users".into()))
            .await
            .unwrap();

        driver
            .send(Action::AddColumn {
                table: "users".into(),
                name: "age".into(),
                data_type: "integer".into(),
            })
            .await
            .unwrap();

        let content = driver.state.content.as_ref().unwrap();
        assert_eq!(content.columns.last().map(String::as_str), Some("age"));
        assert!(content.rows.iter().all(|row| row.len() == 4));
    }
}

mod rows {
    use super::*;

    async fn users_driver(gateway: &Arc<FakeGateway>) -> tabula::cli::Driver {
        let mut driver = connected_driver(Arc::clone(gateway), SessionSettings::default()).await;
        driver
            .send(Action::SelectTable("users".into()))
            .await
            .unwrap();
        driver
    }

    #[tokio::test]
    async fn inserted_row_gets_next_key_and_page_reloads() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(3)));
        let mut driver = users_driver(&gateway).await;

        driver
            .send(Action::InsertRow {
                table: "users".into(),
                values: vec![ColumnValue::new("name", Some("dave".into()))],
            })
            .await
            .unwrap();

        let stored = gateway.table("users").unwrap();
        assert_eq!(stored.rows.len(), 4);
        assert_eq!(stored.rows[3][0].as_deref(), Some("4"));
        assert_eq!(stored.rows[3][2], None);
        let content = driver.state.content.as_ref().unwrap();
        assert_eq!(content.total_count, 4);
        assert_eq!(content.cell(3, "name"), Some("dave"));
        assert_eq!(content.cell_value(3, "email"), Some(None));
    }

    #[tokio::test]
    async fn insert_violating_not_null_is_reported() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(1)));
        let mut driver = users_driver(&gateway).await;

        let result = driver
            .send(Action::InsertRow {
                table: "users".into(),
                values: vec![],
            })
            .await;

        assert!(result.is_err());
        assert_eq!(gateway.table("users").unwrap().rows.len(), 1);
        assert!(
            driver.state.errors.latest().unwrap().message.contains("not-null")
        );
    }

    #[tokio::test]
    async fn cloned_row_copies_values_under_a_new_key() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(3)));
        let mut driver = users_driver(&gateway).await;

        driver
            .send(Action::CloneRow { row_index: 1 })
            .await
            .unwrap();

        let stored = gateway.table("users").unwrap();
        assert_eq!(stored.rows.len(), 4);
        assert_eq!(stored.rows[3][0].as_deref(), Some("4"));
        assert_eq!(stored.rows[3][1].as_deref(), Some("user2"));
        assert_eq!(stored.rows[3][2].as_deref(), Some("user2@example.com"));
        assert_eq!(driver.state.content.as_ref().unwrap().total_count, 4);
    }

    #[tokio::test]
    async fn deleted_rows_leave_content_without_reload() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(3)));
        let mut driver = users_driver(&gateway).await;
        let loads = gateway.count_calls("get_table_content");

        driver
            .send(Action::DeleteDisplayedRows(vec![0, 2]))
            .await
            .unwrap();

        assert_eq!(gateway.count_calls("get_table_content"), loads);
        assert_eq!(gateway.count_calls("delete_rows:users:2"), 1);
        assert_eq!(gateway.table("users").unwrap().rows.len(), 1);
        let content = driver.state.content.as_ref().unwrap();
        assert_eq!(content.rows.len(), 1);
        assert_eq!(content.total_count, 1);
        assert_eq!(content.cell(0, "id"), Some("2"));
    }

    #[tokio::test]
    async fn renamed_table_stays_displayed_under_new_name() {
        let gateway = Arc::new(
            FakeGateway::new()
                .with_table("users", fixtures::users(2))
                .with_table("orders", fixtures::orders()),
        );
        let mut driver = users_driver(&gateway).await;

        driver
            .send(Action::RenameTable {
                from: "users".into(),
                to: "customers".into(),
            })
            .await
            .unwrap();

        assert!(driver.state.registry.contains("customers"));
        assert!(!driver.state.registry.contains("users"));
        assert_eq!(driver.state.displayed_table(), Some("customers"));
        assert_eq!(driver.state.selected_table.as_deref(), Some("customers"));

        driver.send(Action::ReloadCurrentTable).await.unwrap();

        assert_eq!(gateway.count_calls("get_table_content:customers"), 1);
        assert_eq!(driver.state.content.as_ref().unwrap().rows.len(), 2);
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn load_finishing_after_disconnect_is_ignored() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(3)));
        let mut driver = connected_driver(Arc::clone(&gateway), SessionSettings::default()).await;
        gateway.gate_content("users");

        driver.dispatch(Action::SelectTable("users".into()));
        gateway.wait_parked("users").await;
        driver.dispatch(Action::Disconnect);
        gateway.release("users");
        driver.settle().await.unwrap();

        assert!(driver.state.connection_state.is_closed());
        assert!(driver.state.content.is_none());
        assert!(driver.state.registry.is_empty());
        assert!(!driver.state.is_fetching);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn missing_table_is_reported_through_the_store() {
        let gateway = Arc::new(FakeGateway::new().with_table("users", fixtures::users(1)));
        let mut driver = connected_driver(Arc::clone(&gateway), SessionSettings::default()).await;

        let result = driver.send(Action::SelectTable("ghost".into())).await;

        assert!(result.is_err());
        assert!(driver.state.content.is_none());
        assert!(!driver.state.is_fetching);
        assert!(
            driver.state.errors.latest().unwrap().message.contains("does not exist")
        );
    }
}
