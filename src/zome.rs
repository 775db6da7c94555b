//! `my_zome`: sample entries plus users with commitments.
//!
//! Users hang off a single well-known anchor entry through `users` links;
//! commitments hang off their user through `commitments` links.

use diorama_core::{
    parse_input, to_output, Address, Entry, Zome, ZomeApi, ZomeApiError, ZomeApiResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ZOME_NAME: &str = "my_zome";

pub const MY_ENTRY: &str = "my_entry";
pub const ANCHOR: &str = "anchor";
pub const USER: &str = "user";
pub const COMMITMENT: &str = "commitment";

pub const USERS_LINK: &str = "users";
pub const COMMITMENTS_LINK: &str = "commitments";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyEntry {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub title: String,
}

/// Named list returned by the listing functions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList<T> {
    pub name: String,
    pub items: Vec<T>,
}

impl<T> ItemList<T> {
    fn new(name: &str, items: Vec<T>) -> Self {
        Self {
            name: name.to_string(),
            items,
        }
    }
}

#[derive(Deserialize)]
struct CreateMyEntryInput {
    entry: MyEntry,
}

#[derive(Deserialize)]
struct AddressInput {
    address: Address,
}

#[derive(Deserialize)]
struct CreateUserInput {
    user: User,
}

#[derive(Deserialize)]
struct CreateCommitmentInput {
    commitment: Commitment,
    user_addr: Address,
}

#[derive(Deserialize)]
struct UserAddrInput {
    user_addr: Address,
}

/// The single anchor every user is linked from
pub fn anchor_entry() -> ZomeApiResult<Entry> {
    Ok(Entry::app(ANCHOR, &ANCHOR)?)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MyZome;

impl MyZome {
    fn create_my_entry(&self, api: &ZomeApi<'_>, input: CreateMyEntryInput) -> ZomeApiResult<Address> {
        api.commit_entry(&Entry::app(MY_ENTRY, &input.entry)?)
    }

    fn get_my_entry(&self, api: &ZomeApi<'_>, input: AddressInput) -> ZomeApiResult<Option<Entry>> {
        api.get_entry(&input.address)
    }

    fn create_anchor(&self, api: &ZomeApi<'_>) -> ZomeApiResult<Address> {
        api.commit_entry(&anchor_entry()?)
    }

    fn create_user(&self, api: &ZomeApi<'_>, input: CreateUserInput) -> ZomeApiResult<Address> {
        let anchor_address = api.entry_address(&anchor_entry()?);
        let user_address = api.commit_entry(&Entry::app(USER, &input.user)?)?;
        api.link_entries(&anchor_address, &user_address, USERS_LINK, "")?;
        Ok(user_address)
    }

    fn get_users(&self, api: &ZomeApi<'_>) -> ZomeApiResult<ItemList<User>> {
        let anchor_address = api.entry_address(&anchor_entry()?);
        let users = self.load_all(api, &anchor_address, USERS_LINK);
        Ok(ItemList::new(USERS_LINK, users))
    }

    fn create_commitment(&self, api: &ZomeApi<'_>, input: CreateCommitmentInput) -> ZomeApiResult<Address> {
        // Check the user exists before anything lands on the chain.
        api.get_as_type::<User>(&input.user_addr)?;

        let commitment_address = api.commit_entry(&Entry::app(COMMITMENT, &input.commitment)?)?;
        api.link_entries(&input.user_addr, &commitment_address, COMMITMENTS_LINK, "")?;
        Ok(commitment_address)
    }

    /// The user at `user_addr`, listed under `users`, if they have made at
    /// least one commitment.
    fn get_user_commitments(&self, api: &ZomeApi<'_>, input: UserAddrInput) -> ZomeApiResult<ItemList<User>> {
        let committed = !api
            .get_links(&input.user_addr, COMMITMENTS_LINK, Some(""))?
            .is_empty();

        let items = if committed {
            match api.get_as_type::<User>(&input.user_addr) {
                Ok(user) => vec![user],
                Err(ZomeApiError::HashNotFound(_)) => Vec::new(),
                Err(e) => return Err(e),
            }
        } else {
            Vec::new()
        };
        Ok(ItemList::new(USERS_LINK, items))
    }

    fn get_commitments(&self, api: &ZomeApi<'_>, input: UserAddrInput) -> ZomeApiResult<ItemList<Commitment>> {
        let commitments = self.load_all(api, &input.user_addr, COMMITMENTS_LINK);
        Ok(ItemList::new(COMMITMENTS_LINK, commitments))
    }

    /// Decode every entry linked from `base`, skipping ones that are missing
    /// or do not decode.
    fn load_all<T: serde::de::DeserializeOwned>(&self, api: &ZomeApi<'_>, base: &Address, link_type: &str) -> Vec<T> {
        let targets = match api.get_links(base, link_type, Some("")) {
            Ok(targets) => targets,
            Err(e) => {
                tracing::debug!(base = %base, link_type, error = %e, "Failed to read links");
                return Vec::new();
            }
        };
        targets
            .iter()
            .filter_map(|address| api.get_as_type::<T>(address).ok())
            .collect()
    }
}

impl Zome for MyZome {
    fn name(&self) -> &str {
        ZOME_NAME
    }

    fn call(&self, api: &ZomeApi<'_>, function: &str, payload: Value) -> ZomeApiResult<Value> {
        match function {
            "create_my_entry" => to_output(self.create_my_entry(api, parse_input(payload)?)?),
            "get_my_entry" => to_output(self.get_my_entry(api, parse_input(payload)?)?),
            "create_anchor" => to_output(self.create_anchor(api)?),
            "create_user" => to_output(self.create_user(api, parse_input(payload)?)?),
            "get_users" => to_output(self.get_users(api)?),
            "create_commitment" => to_output(self.create_commitment(api, parse_input(payload)?)?),
            "get_user_commitments" => to_output(self.get_user_commitments(api, parse_input(payload)?)?),
            "get_commitments" => to_output(self.get_commitments(api, parse_input(payload)?)?),
            other => Err(ZomeApiError::FunctionNotImplemented(format!("{}/{}", ZOME_NAME, other))),
        }
    }
}
