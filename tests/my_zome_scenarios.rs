//! my_zome behaviour as seen through the scenario runner
//!
//! Runs the shipped scenarios plus extra ones that probe error envelopes and
//! visibility between alice and bob.

use std::time::Duration;

use diorama_core::Address;
use diorama_scenarios::{Diorama, ExecutorPolicy, Outcome};
use my_first_app::scenarios::{self, ROUND_TRIP, USER_COMMITMENT};
use my_first_app::{config, zome::ZOME_NAME};
use serde_json::json;

const DNA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/dist/my_first_app.dna.json");

fn diorama() -> Diorama {
    Diorama::new(config(DNA)).unwrap()
}

// ============================================================================
// Shipped scenarios
// ============================================================================

#[tokio::test]
async fn test_shipped_scenarios_pass() {
    let mut diorama = diorama();
    scenarios::register(&mut diorama);

    let report = diorama.run().await;
    assert!(report.success(), "{}", report.to_tap());
    assert_eq!(report.exit_code(), 0);

    let described: Vec<_> = report.scenarios.iter().map(|s| s.description.as_str()).collect();
    assert_eq!(described, vec![ROUND_TRIP, USER_COMMITMENT]);
    for scenario in &report.scenarios {
        assert_eq!(scenario.assertions.len(), 1);
        assert_eq!(scenario.outcome, Outcome::Passed);
    }
}

#[tokio::test]
async fn test_shipped_scenarios_pass_concurrently() {
    let mut diorama = Diorama::new(config(DNA).executor(ExecutorPolicy::Concurrent)).unwrap();
    scenarios::register(&mut diorama);

    let report = diorama.run().await;
    assert!(report.success(), "{}", report.to_tap());
}

#[tokio::test]
async fn test_rerun_is_identical() {
    let mut diorama = diorama();
    scenarios::register(&mut diorama);

    let first = diorama.run().await;
    let second = diorama.run().await;

    for (a, b) in first.scenarios.iter().zip(&second.scenarios) {
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.assertions, b.assertions);
    }
}

#[tokio::test]
async fn test_tap_output_for_passing_run() {
    let mut diorama = diorama();
    scenarios::register(&mut diorama);

    let tap = diorama.run().await.to_tap();
    assert!(tap.starts_with("TAP version 13\n"));
    assert!(tap.contains("# description of example test\nok 1 - entry reads back as committed\n"));
    assert!(tap.contains("# create user, commitment\nok 2 - committed user is listed\n"));
    assert!(tap.contains("1..2"));
    assert!(tap.contains("# pass  2"));
}

// ============================================================================
// Zome behaviour
// ============================================================================

#[tokio::test]
async fn test_identical_content_has_identical_address() {
    let mut diorama = diorama();
    diorama.register_scenario("same content", |_s, t, instances| async move {
        let alice = instances.get("alice")?;
        let bob = instances.get("bob")?;
        let payload = json!({"entry": {"content": "sample content"}});

        let a = alice.call(ZOME_NAME, "create_my_entry", payload.clone()).await;
        let b = bob.call(ZOME_NAME, "create_my_entry", payload).await;
        t.call_ok(&a, "alice commits");
        t.deep_equal(&a, &b, "same address on both instances");

        let address = a.into_result()?;
        t.equal(address.as_str().map(|s| s.len()), Some(46), "multihash length");
        t.ok(address.as_str().is_some_and(|s| s.starts_with("Qm")), "multihash prefix");
        Ok(())
    });

    let report = diorama.run().await;
    assert!(report.success(), "{}", report.to_tap());
}

#[tokio::test]
async fn test_get_unknown_entry_is_ok_null() {
    let mut diorama = diorama();
    diorama.register_scenario("missing entry", |_s, t, instances| async move {
        let alice = instances.get("alice")?;
        let unknown = Address::from_content(b"never committed").to_string();

        let result = alice.call(ZOME_NAME, "get_my_entry", json!({"address": unknown})).await;
        t.deep_equal(&result, &json!({"Ok": null}), "missing entry reads as null");
        Ok(())
    });

    let report = diorama.run().await;
    assert!(report.success(), "{}", report.to_tap());
}

#[tokio::test]
async fn test_bad_user_addr_is_error_envelope() {
    let mut diorama = diorama();
    diorama.register_scenario("bad user_addr", |_s, t, instances| async move {
        let alice = instances.get("alice")?;
        let commitment = json!({"title": "Attend workshop"});

        let malformed = alice
            .call(
                ZOME_NAME,
                "create_commitment",
                json!({"commitment": commitment, "user_addr": "not a hash"}),
            )
            .await;
        t.call_err(&malformed, "malformed address is rejected");
        t.equal(
            malformed.err().map(|e| e.kind()),
            Some("ArgumentDeserializationFailed"),
            "rejected while reading arguments",
        );

        let other = alice
            .call(ZOME_NAME, "create_my_entry", json!({"entry": {"content": "not a user"}}))
            .await
            .into_result()?;
        let missing = alice
            .call(
                ZOME_NAME,
                "create_commitment",
                json!({"commitment": commitment, "user_addr": Address::from_content(b"nobody").to_string()}),
            )
            .await;
        t.equal(missing.err().map(|e| e.kind()), Some("HashNotFound"), "unresolved address");

        let wrong_type = alice
            .call(ZOME_NAME, "create_commitment", json!({"commitment": commitment, "user_addr": other}))
            .await;
        t.call_err(&wrong_type, "address of a non-user entry is rejected");

        t.equal(alice.handle().chain_len(), 1, "nothing committed by failed calls");
        Ok(())
    });

    let report = diorama.run().await;
    assert!(report.success(), "{}", report.to_tap());
}

#[tokio::test]
async fn test_create_user_needs_anchor() {
    let mut diorama = diorama();
    diorama.register_scenario("no anchor", |_s, t, instances| async move {
        let alice = instances.get("alice")?;
        let result = alice
            .call(ZOME_NAME, "create_user", json!({"user": {"name": "John Doe"}}))
            .await;
        t.equal(result.err().map(|e| e.kind()), Some("ValidationFailed"), "link base missing");
        Ok(())
    });

    let report = diorama.run().await;
    assert!(report.success(), "{}", report.to_tap());
}

#[tokio::test]
async fn test_users_and_commitments_listing() {
    let mut diorama = diorama();
    diorama.register_scenario("listing", |_s, t, instances| async move {
        let alice = instances.get("alice")?;
        alice.call(ZOME_NAME, "create_anchor", json!({})).await.into_result()?;

        let user_addr = alice
            .call(ZOME_NAME, "create_user", json!({"user": {"name": "John Doe"}}))
            .await
            .into_result()?;

        let users = alice.call(ZOME_NAME, "get_users", json!({})).await;
        t.deep_equal(&users, &json!({"Ok": {"name": "users", "items": [{"name": "John Doe"}]}}), "user listed");

        let before = alice
            .call(ZOME_NAME, "get_user_commitments", json!({"user_addr": user_addr}))
            .await;
        t.deep_equal(&before, &json!({"Ok": {"name": "users", "items": []}}), "no commitments yet");

        for title in ["Attend workshop", "Write notes"] {
            alice
                .call(
                    ZOME_NAME,
                    "create_commitment",
                    json!({"commitment": {"title": title}, "user_addr": user_addr}),
                )
                .await
                .into_result()?;
        }

        let commitments = alice
            .call(ZOME_NAME, "get_commitments", json!({"user_addr": user_addr}))
            .await;
        t.deep_equal(
            &commitments,
            &json!({"Ok": {"name": "commitments", "items": [{"title": "Attend workshop"}, {"title": "Write notes"}]}}),
            "commitments in creation order",
        );
        Ok(())
    });

    let report = diorama.run().await;
    assert!(report.success(), "{}", report.to_tap());
}

#[tokio::test(start_paused = true)]
async fn test_bob_sees_alice_after_consistent() {
    let config = config(DNA).gossip_delay(Duration::from_millis(100));
    let mut diorama = Diorama::new(config).unwrap();

    diorama.register_scenario("shared users", |s, t, instances| async move {
        let alice = instances.get("alice")?;
        let bob = instances.get("bob")?;

        alice.call(ZOME_NAME, "create_anchor", json!({})).await.into_result()?;
        alice
            .call(ZOME_NAME, "create_user", json!({"user": {"name": "John Doe"}}))
            .await
            .into_result()?;

        let early = bob.call(ZOME_NAME, "get_users", json!({})).await;
        t.deep_equal(&early, &json!({"Ok": {"name": "users", "items": []}}), "bob sees nothing yet");

        s.consistent().await;

        let late = bob.call(ZOME_NAME, "get_users", json!({})).await;
        t.deep_equal(
            &late,
            &json!({"Ok": {"name": "users", "items": [{"name": "John Doe"}]}}),
            "bob sees alice's user",
        );
        Ok(())
    });

    let report = diorama.run().await;
    assert!(report.success(), "{}", report.to_tap());
}

#[tokio::test]
async fn test_undeclared_function_is_error_envelope() {
    let mut diorama = diorama();
    diorama.register_scenario("undeclared", |_s, t, instances| async move {
        let result = instances.get("bob")?.call(ZOME_NAME, "delete_user", json!({})).await;
        t.deep_equal(
            &result,
            &json!({"Err": {"FunctionNotImplemented": "my_zome/delete_user"}}),
            "unknown function",
        );
        Ok(())
    });

    let report = diorama.run().await;
    assert!(report.success(), "{}", report.to_tap());
}

#[tokio::test]
async fn test_failing_scenario_sets_exit_code() {
    let mut diorama = diorama();
    scenarios::register(&mut diorama);
    diorama.register_scenario("wrong expectation", |_s, t, instances| async move {
        let users = instances.get("alice")?.call(ZOME_NAME, "get_users", json!({})).await;
        t.deep_equal(&users, &json!({"Ok": {"name": "users", "items": [{"name": "Nobody"}]}}), "expects a user");
        Ok(())
    });

    let report = diorama.run().await;
    assert_eq!(report.scenario(ROUND_TRIP).map(|s| s.outcome), Some(Outcome::Passed));
    assert_eq!(report.scenario("wrong expectation").map(|s| s.outcome), Some(Outcome::Failed));
    assert_eq!(report.exit_code(), 1);
    assert!(report.to_tap().contains("not ok 3 - expects a user"));
}

#[tokio::test]
async fn test_dereferencing_error_envelope_fails_scenario() {
    let mut diorama = diorama();
    diorama.register_scenario("uses Err as Ok", |_s, _t, instances| async move {
        let alice = instances.get("alice")?;
        alice
            .call(ZOME_NAME, "create_commitment", json!({"commitment": {"title": "x"}, "user_addr": "bad"}))
            .await
            .into_result()?;
        Ok(())
    });

    let report = diorama.run().await;
    let scenario = &report.scenarios[0];
    assert_eq!(scenario.outcome, Outcome::Failed);
    assert!(scenario.errors[0].starts_with("Argument deserialization failed"));
}
