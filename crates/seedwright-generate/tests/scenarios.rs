use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Value, json};

use seedwright_core::{Cell, DataModel, GeneratedValue, Row};
use seedwright_generate::{GenerateOptions, GenerationError, Seeder};
use seedwright_plan::{
    CallbackError, ChildSpec, ConnectMatcher, ConnectSpec, CountConfig, FieldOptions,
    Fingerprint, FingerprintField, ModelRecord, Plan, PredicateFn, StoreView, UserModel,
    UserModels,
};

fn serial_id(sequence: &str) -> Value {
    json!({
        "kind": "scalar", "name": "id", "columnName": "id", "type": "int4",
        "isRequired": true, "isId": true, "hasDefaultValue": true,
        "sequence": { "identifier": sequence, "increment": 1, "start": 1 }
    })
}

fn scalar(name: &str, column_type: &str, required: bool) -> Value {
    json!({
        "kind": "scalar", "name": name, "columnName": name, "type": column_type,
        "isRequired": required
    })
}

fn parent(name: &str, target: &str, relation: &str, column: &str, required: bool) -> Value {
    json!({
        "kind": "object", "name": name, "type": target, "relationName": relation,
        "relationFromFields": [column], "relationToFields": ["id"], "isRequired": required
    })
}

fn child(name: &str, target: &str, relation: &str) -> Value {
    json!({ "kind": "object", "name": name, "type": target, "relationName": relation, "isList": true })
}

fn users_and_posts() -> DataModel {
    serde_json::from_value(json!({
        "dialect": "postgres",
        "models": {
            "User": {
                "id": "User",
                "tableName": "user",
                "schemaName": "public",
                "fields": [
                    serial_id("public.user_id_seq"),
                    scalar("email", "text", true),
                    child("posts", "Post", "PostToUser")
                ],
                "uniqueConstraints": [{ "name": "user_email_key", "fields": ["email"] }]
            },
            "Post": {
                "id": "Post",
                "tableName": "post",
                "schemaName": "public",
                "fields": [
                    serial_id("public.post_id_seq"),
                    scalar("title", "text", true),
                    scalar("author_id", "int4", true),
                    parent("author", "User", "PostToUser", "author_id", true)
                ]
            }
        }
    }))
    .expect("data model")
}

fn employees() -> DataModel {
    serde_json::from_value(json!({
        "dialect": "postgres",
        "models": {
            "Employee": {
                "id": "Employee",
                "tableName": "employee",
                "schemaName": "public",
                "fields": [
                    serial_id("public.employee_id_seq"),
                    scalar("name", "text", true),
                    scalar("manager_id", "int4", false),
                    parent("manager", "Employee", "Reports", "manager_id", false),
                    child("reports", "Employee", "Reports")
                ]
            }
        }
    }))
    .expect("data model")
}

fn teams_and_articles() -> DataModel {
    serde_json::from_value(json!({
        "dialect": "postgres",
        "models": {
            "Team": {
                "id": "Team",
                "tableName": "team",
                "fields": [
                    serial_id("team_id_seq"),
                    child("articles", "Article", "ArticleToTeam")
                ]
            },
            "Article": {
                "id": "Article",
                "tableName": "article",
                "fields": [
                    serial_id("article_id_seq"),
                    scalar("team_id", "int4", true),
                    scalar("slug", "text", true),
                    parent("team", "Team", "ArticleToTeam", "team_id", true)
                ],
                "uniqueConstraints": [{ "name": "article_team_slug", "fields": ["team_id", "slug"] }]
            }
        }
    }))
    .expect("data model")
}

fn int(row: &Row, column: &str) -> Option<i64> {
    row.get(column)
        .and_then(Cell::value)
        .and_then(GeneratedValue::as_i64)
}

#[tokio::test]
async fn scenario_a_sequential_ids_and_unique_emails() {
    let mut seeder = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    let store = seeder
        .generate(&Plan::new().model("User", ChildSpec::count(5)))
        .await
        .expect("generate");

    let users = store.rows("User");
    assert_eq!(users.len(), 5);
    let ids: Vec<i64> = users.iter().filter_map(|row| int(row, "id")).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    let emails: BTreeSet<String> = users
        .iter()
        .filter_map(|row| row.get("email").and_then(Cell::value).map(GeneratedValue::key))
        .collect();
    assert_eq!(emails.len(), 5);
}

#[tokio::test]
async fn scenario_b_children_reference_their_parent() {
    let mut seeder = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    let plan = Plan::new().model(
        "User",
        ChildSpec::count(5).each(ModelRecord::new().children("posts", ChildSpec::count(3))),
    );
    let store = seeder.generate(&plan).await.expect("generate");

    let users = store.rows("User");
    let posts = store.rows("Post");
    assert_eq!(users.len(), 5);
    assert_eq!(posts.len(), 15);
    for (user_idx, user) in users.iter().enumerate() {
        let user_id = int(user, "id");
        let own: Vec<&Row> = posts[user_idx * 3..user_idx * 3 + 3].iter().collect();
        assert!(own.iter().all(|post| int(post, "author_id") == user_id));
    }
}

#[tokio::test]
async fn scenario_c_self_reference_inserts_then_updates() {
    let mut seeder = Seeder::new(employees(), GenerateOptions::default()).expect("seeder");
    let plan = Plan::new().model(
        "Employee",
        ChildSpec::count(10).each(ModelRecord::new().connect("manager", ConnectSpec::any())),
    );
    let store = seeder.generate(&plan).await.expect("generate");
    let statements = seeder.to_sql(&store).expect("sql");

    let inserts: Vec<&String> = statements.iter().filter(|sql| sql.starts_with("INSERT")).collect();
    let updates: Vec<&String> = statements.iter().filter(|sql| sql.starts_with("UPDATE")).collect();
    assert_eq!(inserts.len(), 10);
    assert_eq!(updates.len(), 9);
    assert!(statements[..10].iter().all(|sql| sql.starts_with("INSERT")));

    // INSERTs never carry a manager id; every id an UPDATE points at was inserted earlier.
    let inserted: BTreeSet<i64> = store.rows("Employee").iter().filter_map(|row| int(row, "id")).collect();
    for row in store.rows("Employee") {
        if let Some(manager) = int(row, "manager_id") {
            assert!(inserted.contains(&manager));
            assert!(manager < int(row, "id").expect("id"));
        }
    }
    assert!(inserts.iter().all(|sql| sql.contains(", NULL)")));
}

#[tokio::test]
async fn scenario_d_exhausted_composite_unique() {
    let mut fingerprint = Fingerprint::default();
    fingerprint.insert(
        "Article",
        "slug",
        FingerprintField {
            options: Some(FieldOptions {
                values: Some(vec![json!("alpha"), json!("beta")]),
                ..FieldOptions::default()
            }),
            ..FingerprintField::default()
        },
    );
    let mut seeder = Seeder::new(teams_and_articles(), GenerateOptions::default())
        .expect("seeder")
        .with_fingerprint(fingerprint)
        .expect("fingerprint");

    let plan = Plan::new().model(
        "Team",
        ChildSpec::count(1).each(ModelRecord::new().children("articles", ChildSpec::count(3))),
    );
    let err = seeder.generate(&plan).await.expect_err("third slug cannot be unique");
    match err {
        GenerationError::UniqueConstraintExhausted {
            model,
            fields,
            attempts,
        } => {
            assert_eq!(model, "Article");
            assert_eq!(fields, vec!["team_id".to_string(), "slug".to_string()]);
            assert_eq!(attempts, GenerateOptions::default().max_unique_attempts);
        }
        other => panic!("unexpected error: {other}"),
    }

    // The failed call left nothing behind.
    assert!(seeder.store().is_empty());
    assert_eq!(seeder.report().rows_total, 0);
}

fn post_with_author(connect: ConnectSpec) -> Plan {
    Plan::new().model(
        "Post",
        ChildSpec::count(1).each(ModelRecord::new().connect("author", connect)),
    )
}

#[tokio::test]
async fn unmatched_connect_falls_back_whether_or_not_the_pool_is_empty() {
    let missing = || ConnectSpec::criteria([("email", "nobody@example.com")]);

    let mut empty = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    let from_empty = empty.generate(&post_with_author(missing())).await.expect("fallback");

    let mut populated = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    populated
        .generate(&Plan::new().model("User", ChildSpec::count(3)))
        .await
        .expect("users");
    let from_populated = populated.generate(&post_with_author(missing())).await.expect("fallback");

    for (seeder, store) in [(&empty, &from_empty), (&populated, &from_populated)] {
        assert_eq!(store.rows("Post").len(), 1);
        assert_eq!(store.rows("User").len(), 1);
        assert_eq!(seeder.report().models["Post"].fallback_parents, 1);
        assert_eq!(
            int(&store.rows("Post")[0], "author_id"),
            int(&store.rows("User")[0], "id")
        );
    }
}

#[tokio::test]
async fn unmatched_connect_without_fallback_fails_either_way() {
    let missing = || ConnectSpec::criteria([("email", "nobody@example.com")]).without_fallback();

    let mut empty = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    let mut populated = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    populated
        .generate(&Plan::new().model("User", ChildSpec::count(2)))
        .await
        .expect("users");

    for seeder in [&mut empty, &mut populated] {
        let err = seeder.generate(&post_with_author(missing())).await.expect_err("no match");
        assert!(matches!(
            err,
            GenerationError::RequiredConnectUnmatched { ref model, ref field }
                if model == "Post" && field == "author"
        ));
    }
}

#[tokio::test]
async fn connect_reaches_rows_from_earlier_calls_and_existing_rows() {
    let mut seeder = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    let mut existing = Row::new();
    existing.insert("id".to_string(), Cell::Value(GeneratedValue::Int(40)));
    existing.insert("email".to_string(), Cell::Value("ops@example.com".into()));
    seeder.add_existing("User", vec![existing]).expect("existing");

    let store = seeder
        .generate(&post_with_author(ConnectSpec::criteria([("email", "ops@example.com")])))
        .await
        .expect("connect");
    assert!(store.rows("User").is_empty());
    assert_eq!(int(&store.rows("Post")[0], "author_id"), Some(40));

    // Sequences skip past existing ids.
    let users = seeder
        .generate(&Plan::new().model("User", ChildSpec::count(1)))
        .await
        .expect("users");
    assert_eq!(int(&users.rows("User")[0], "id"), Some(41));
    assert!(seeder.to_sql(&users).expect("sql")[0].contains("VALUES (41,"));
}

#[tokio::test]
async fn predicate_connect_picks_the_matching_row() {
    let mut seeder = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    seeder
        .generate(&Plan::new().model("User", ChildSpec::count(3)))
        .await
        .expect("users");

    let third: PredicateFn = Arc::new(|row: &Row| int(row, "id") == Some(3));
    let spec = ConnectSpec {
        matcher: ConnectMatcher::Predicate(third),
        fallback: false,
    };
    let store = seeder.generate(&post_with_author(spec)).await.expect("connect");
    assert!(store.rows("User").is_empty());
    assert_eq!(int(&store.rows("Post")[0], "author_id"), Some(3));
}

#[tokio::test]
async fn callbacks_see_index_and_errors_carry_the_path() {
    let mut seeder = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    let plan = Plan::new().model(
        "User",
        ChildSpec::count(2).each(
            ModelRecord::new().with("email", |ctx| Ok(format!("user{}@example.com", ctx.index).into())),
        ),
    );
    let store = seeder.generate(&plan).await.expect("generate");
    let emails: Vec<String> = store
        .rows("User")
        .iter()
        .filter_map(|row| row.get("email").and_then(Cell::value).map(GeneratedValue::key))
        .collect();
    assert_eq!(emails, vec!["user0@example.com", "user1@example.com"]);

    let failing = Plan::new().model(
        "User",
        ChildSpec::count(1).each(ModelRecord::new().with("email", |_| Err("lookup failed".into()))),
    );
    let err = seeder.generate(&failing).await.expect_err("callback error");
    assert!(matches!(
        err,
        GenerationError::Callback { ref path, ref message }
            if path == "seedwright/User/2/email" && message == "lookup failed"
    ));
}

#[tokio::test]
async fn cancelled_runs_discard_everything() {
    let mut seeder = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    let handle = seeder.cancel_handle();
    handle.cancel();
    let err = seeder
        .generate(&Plan::new().model("User", ChildSpec::count(3)))
        .await
        .expect_err("cancelled");
    assert!(matches!(err, GenerationError::Cancelled));
    assert!(seeder.store().is_empty());

    handle.reset();
    let store = seeder
        .generate(&Plan::new().model("User", ChildSpec::count(1)))
        .await
        .expect("runs after reset");
    assert_eq!(int(&store.rows("User")[0], "id"), Some(1));
}

#[tokio::test]
async fn omitted_required_parent_is_generated() {
    let mut seeder = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    let store = seeder
        .generate(&Plan::new().model("Post", ChildSpec::count(2)))
        .await
        .expect("generate");
    assert_eq!(store.rows("User").len(), 2);
    let statements = seeder.to_sql(&store).expect("sql");
    assert!(statements[0].starts_with("INSERT INTO \"public\".\"user\""));
    assert!(statements[1].starts_with("INSERT INTO \"public\".\"user\""));
    assert!(statements[2].starts_with("INSERT INTO \"public\".\"post\""));
}

fn users_categories_posts() -> DataModel {
    serde_json::from_value(json!({
        "dialect": "postgres",
        "models": {
            "User": {
                "id": "User",
                "tableName": "user",
                "fields": [
                    serial_id("user_id_seq"),
                    scalar("email", "text", true),
                    child("posts", "Post", "PostToUser"),
                    child("categories", "Category", "CategoryToUser")
                ],
                "uniqueConstraints": [{ "name": "user_email_key", "fields": ["email"] }]
            },
            "Category": {
                "id": "Category",
                "tableName": "category",
                "fields": [
                    serial_id("category_id_seq"),
                    scalar("label", "text", true),
                    scalar("owner_id", "int4", true),
                    parent("owner", "User", "CategoryToUser", "owner_id", true),
                    child("posts", "Post", "PostToCategory")
                ]
            },
            "Post": {
                "id": "Post",
                "tableName": "post",
                "fields": [
                    serial_id("post_id_seq"),
                    scalar("title", "text", true),
                    scalar("category_id", "int4", true),
                    parent("category", "Category", "PostToCategory", "category_id", true),
                    scalar("author_id", "int4", true),
                    parent("author", "User", "PostToUser", "author_id", true)
                ]
            }
        }
    }))
    .expect("data model")
}

#[tokio::test]
async fn fallback_parents_fan_out_into_children_that_need_fallbacks() {
    let mut fingerprint = Fingerprint::default();
    fingerprint.insert(
        "User",
        "posts",
        FingerprintField {
            count: Some(CountConfig::Fixed(1)),
            ..FingerprintField::default()
        },
    );
    let mut user_models = UserModels::default();
    user_models.insert(
        "User",
        UserModel {
            connect: true,
            ..UserModel::default()
        },
    );
    let mut seeder = Seeder::new(users_categories_posts(), GenerateOptions::default())
        .expect("seeder")
        .with_fingerprint(fingerprint)
        .expect("fingerprint")
        .with_user_models(user_models)
        .expect("user models");

    // Post -> Category (fallback) -> User (fallback) -> posts -> Post -> Category (fallback
    // again while the first one is still pending).
    let store = seeder
        .generate(&Plan::new().model("Post", ChildSpec::count(1)))
        .await
        .expect("acyclic schema generates");

    assert_eq!(store.rows("User").len(), 1);
    assert_eq!(store.rows("Category").len(), 2);
    assert_eq!(store.rows("Post").len(), 2);
    let user_id = int(&store.rows("User")[0], "id");
    assert!(store.rows("Category").iter().all(|row| int(row, "owner_id") == user_id));
    assert!(store.rows("Post").iter().all(|row| int(row, "author_id") == user_id));
    assert_eq!(seeder.report().models["Post"].fallback_parents, 2);

    let statements = seeder.to_sql(&store).expect("sql");
    assert!(statements[0].starts_with("INSERT INTO \"user\""));
    assert!(statements.iter().all(|sql| sql.starts_with("INSERT")));
}

fn users_and_profiles() -> DataModel {
    serde_json::from_value(json!({
        "dialect": "postgres",
        "models": {
            "User": {
                "id": "User",
                "tableName": "user",
                "fields": [
                    serial_id("user_id_seq"),
                    scalar("email", "text", true),
                    { "kind": "object", "name": "profile", "type": "Profile",
                      "relationName": "ProfileToUser" },
                    child("memberships", "Membership", "MembershipToUser")
                ],
                "uniqueConstraints": [{ "name": "user_email_key", "fields": ["email"] }]
            },
            "Profile": {
                "id": "Profile",
                "tableName": "profile",
                "fields": [
                    serial_id("profile_id_seq"),
                    scalar("user_id", "int4", true),
                    parent("user", "User", "ProfileToUser", "user_id", true)
                ],
                "uniqueConstraints": [{ "name": "profile_user_id_key", "fields": ["user_id"] }]
            },
            "Team": {
                "id": "Team",
                "tableName": "team",
                "fields": [
                    serial_id("team_id_seq"),
                    child("memberships", "Membership", "MembershipToTeam")
                ]
            },
            "Membership": {
                "id": "Membership",
                "tableName": "membership",
                "fields": [
                    serial_id("membership_id_seq"),
                    scalar("team_id", "int4", true),
                    parent("team", "Team", "MembershipToTeam", "team_id", true),
                    scalar("user_id", "int4", true),
                    parent("user", "User", "MembershipToUser", "user_id", true)
                ],
                "uniqueConstraints": [
                    { "name": "membership_team_user", "fields": ["team_id", "user_id"] }
                ]
            }
        }
    }))
    .expect("data model")
}

#[tokio::test]
async fn one_to_one_connect_skips_parents_already_taken() {
    let mut seeder = Seeder::new(users_and_profiles(), GenerateOptions::default()).expect("seeder");
    seeder
        .generate(&Plan::new().model("User", ChildSpec::count(5)))
        .await
        .expect("users");

    let profiles = |count| {
        Plan::new().model(
            "Profile",
            ChildSpec::count(count).each(ModelRecord::new().connect("user", ConnectSpec::any())),
        )
    };
    let store = seeder.generate(&profiles(5)).await.expect("profiles");
    assert!(store.rows("User").is_empty());
    let owners: BTreeSet<i64> = store
        .rows("Profile")
        .iter()
        .filter_map(|row| int(row, "user_id"))
        .collect();
    assert_eq!(owners, (1..=5).collect::<BTreeSet<i64>>());
    assert_eq!(seeder.report().models["Profile"].connected, 5);

    // Every user has a profile, so the next one falls back to a new user.
    let extra = seeder.generate(&profiles(1)).await.expect("fallback");
    assert_eq!(extra.rows("User").len(), 1);
    assert_eq!(int(&extra.rows("Profile")[0], "user_id"), Some(6));
}

#[tokio::test]
async fn composite_keys_over_two_connects_retry_other_pairs() {
    let mut seeder = Seeder::new(users_and_profiles(), GenerateOptions::default()).expect("seeder");
    seeder
        .generate(
            &Plan::new()
                .model("User", ChildSpec::count(2))
                .model("Team", ChildSpec::count(2)),
        )
        .await
        .expect("parents");

    let plan = Plan::new().model(
        "Membership",
        ChildSpec::count(4).each(
            ModelRecord::new()
                .connect("team", ConnectSpec::any())
                .connect("user", ConnectSpec::any()),
        ),
    );
    let store = seeder.generate(&plan).await.expect("every pair fits");
    let pairs: BTreeSet<(i64, i64)> = store
        .rows("Membership")
        .iter()
        .filter_map(|row| Some((int(row, "team_id")?, int(row, "user_id")?)))
        .collect();
    assert_eq!(pairs.len(), 4);
    assert!(store.rows("User").is_empty());
    assert!(store.rows("Team").is_empty());
}

fn companies_and_people() -> DataModel {
    serde_json::from_value(json!({
        "dialect": "postgres",
        "models": {
            "Company": {
                "id": "Company",
                "tableName": "company",
                "fields": [
                    serial_id("company_id_seq"),
                    scalar("label", "text", true),
                    scalar("ceo_id", "int4", false),
                    parent("ceo", "Person", "CompanyCeo", "ceo_id", false),
                    child("staff", "Person", "PersonToCompany")
                ]
            },
            "Person": {
                "id": "Person",
                "tableName": "person",
                "fields": [
                    serial_id("person_id_seq"),
                    { "kind": "scalar", "name": "fullName", "columnName": "full_name",
                      "type": "text", "isRequired": true },
                    scalar("company_id", "int4", true),
                    parent("company", "Company", "PersonToCompany", "company_id", true),
                    child("leads", "Company", "CompanyCeo")
                ]
            }
        }
    }))
    .expect("data model")
}

#[tokio::test]
async fn cross_model_cycle_inserts_null_then_updates() {
    let mut seeder = Seeder::new(companies_and_people(), GenerateOptions::default()).expect("seeder");
    let plan = Plan::new()
        .model("Person", ChildSpec::count(1))
        .model(
            "Company",
            ChildSpec::count(1).each(ModelRecord::new().connect("ceo", ConnectSpec::any())),
        );
    let store = seeder.generate(&plan).await.expect("generate");
    let statements = seeder.to_sql(&store).expect("sql");

    assert_eq!(statements.len(), 4);
    assert!(statements[0].starts_with("INSERT INTO \"company\""));
    assert!(statements[1].starts_with("INSERT INTO \"company\""));
    assert!(statements[..2].iter().all(|sql| sql.ends_with(", NULL);")));
    assert!(statements[2].starts_with("INSERT INTO \"person\""));
    assert!(statements[2].ends_with(", 1);"));
    assert_eq!(
        statements[3],
        "UPDATE \"company\" SET \"ceo_id\" = 1 WHERE \"id\" = 2;"
    );
}

#[tokio::test]
async fn plan_keys_are_field_names_not_column_names() {
    let mut seeder = Seeder::new(companies_and_people(), GenerateOptions::default()).expect("seeder");
    let by_column = Plan::new().model(
        "Person",
        ChildSpec::count(1).each(ModelRecord::new().set("full_name", "Ada Lovelace")),
    );
    let err = seeder.generate(&by_column).await.expect_err("column name");
    assert!(matches!(err, GenerationError::InvalidPlan(ref message) if message.contains("field_not_found")));

    let by_field = Plan::new().model(
        "Person",
        ChildSpec::count(1).each(ModelRecord::new().set("fullName", "Ada Lovelace")),
    );
    let store = seeder.generate(&by_field).await.expect("field name");
    assert_eq!(
        store.rows("Person")[0].get("full_name").and_then(Cell::value),
        Some(&GeneratedValue::Text("Ada Lovelace".to_string()))
    );
}

#[tokio::test]
async fn async_callbacks_resolve_in_walk_order() {
    let mut seeder = Seeder::new(users_and_posts(), GenerateOptions::default()).expect("seeder");
    let plan = Plan::new().model(
        "User",
        ChildSpec::count(2).each(
            ModelRecord::new()
                .with_async("email", |ctx| {
                    let index = ctx.index;
                    async move {
                        tokio::task::yield_now().await;
                        Ok::<_, CallbackError>(GeneratedValue::from(format!("async{index}@example.com")))
                    }
                })
                .children(
                    "posts",
                    ChildSpec::count_async(|ctx| {
                        let count = ctx.index + 1;
                        async move { Ok::<_, CallbackError>(count) }
                    })
                    .each_async(|ctx| {
                        let title = format!("post {}", ctx.index);
                        async move { Ok::<_, CallbackError>(ModelRecord::new().set("title", title)) }
                    }),
                ),
        ),
    );
    let store = seeder.generate(&plan).await.expect("generate");

    let emails: Vec<String> = store
        .rows("User")
        .iter()
        .filter_map(|row| row.get("email").and_then(Cell::value).map(GeneratedValue::key))
        .collect();
    assert_eq!(emails, vec!["async0@example.com", "async1@example.com"]);

    let posts: Vec<(Option<i64>, String)> = store
        .rows("Post")
        .iter()
        .map(|row| {
            let title = row.get("title").and_then(Cell::value).map(GeneratedValue::key);
            (int(row, "author_id"), title.unwrap_or_default())
        })
        .collect();
    assert_eq!(
        posts,
        vec![
            (Some(1), "post 0".to_string()),
            (Some(2), "post 0".to_string()),
            (Some(2), "post 1".to_string()),
        ]
    );
}
