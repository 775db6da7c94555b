//! Scenarios for `my_first_app`, run against `alice` and `bob`.

use diorama_scenarios::Diorama;
use serde_json::json;

use crate::zome::ZOME_NAME;

pub const ROUND_TRIP: &str = "description of example test";
pub const USER_COMMITMENT: &str = "create user, commitment";

/// Register every scenario, in the order they run.
pub fn register(diorama: &mut Diorama) {
    diorama.register_scenario(ROUND_TRIP, |_s, t, instances| async move {
        let alice = instances.get("alice")?;

        let addr = alice
            .call(
                ZOME_NAME,
                "create_my_entry",
                json!({"entry": {"content": "sample content"}}),
            )
            .await
            .into_result()?;
        let result = alice
            .call(ZOME_NAME, "get_my_entry", json!({"address": addr}))
            .await;

        t.deep_equal(
            &result,
            &json!({"Ok": {"App": ["my_entry", "{\"content\":\"sample content\"}"]}}),
            "entry reads back as committed",
        );
        Ok(())
    });

    diorama.register_scenario(USER_COMMITMENT, |_s, t, instances| async move {
        let alice = instances.get("alice")?;

        let anchor_addr = alice.call(ZOME_NAME, "create_anchor", json!({})).await;
        tracing::info!(result = %anchor_addr, "anchor_addr");

        let user_addr = alice
            .call(ZOME_NAME, "create_user", json!({"user": {"name": "John Doe"}}))
            .await;
        tracing::info!(result = %user_addr, "user_addr");
        let user_addr = user_addr.into_result()?;

        let users = alice.call(ZOME_NAME, "get_users", json!({})).await;
        tracing::debug!(result = %users, "users");

        let commitment_addr = alice
            .call(
                ZOME_NAME,
                "create_commitment",
                json!({"commitment": {"title": "Attend workshop"}, "user_addr": user_addr}),
            )
            .await;
        tracing::info!(result = %commitment_addr, "commitment_addr");

        let commitments = alice
            .call(ZOME_NAME, "get_user_commitments", json!({"user_addr": user_addr}))
            .await;

        t.deep_equal(
            &commitments,
            &json!({"Ok": {"name": "users", "items": [{"name": "John Doe"}]}}),
            "committed user is listed",
        );
        Ok(())
    });
}
