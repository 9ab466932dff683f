//! # Dataset
//!
//! The full set of entity collections held by one station, and the
//! snapshot format exchanged with the remote store.
//!
//! ## Snapshot Shape
//! ```text
//! {
//!   "products":      [ { "id": "1", ... } ],      ◄── sequence ids
//!   "customers":     [ ... ],
//!   "cashMovements": [ { "id": "mv_17", ... } ],  ◄── sale-linked id
//!   "users":         [ { "id": "6f1c…", ... } ],  ◄── UUID v4
//!   "settings":      { ... },                     ◄── merged, never replaced
//!   "categories":    [ "Drinks", "Snacks" ]
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::sequence::next_id;
use crate::settings::Settings;
use crate::types::*;
use crate::validation::{validate_customer, validate_product, ValidationResult};

// =============================================================================
// Collections
// =============================================================================

/// Names every persisted collection. The key doubles as the storage key and
/// the snapshot field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Products,
    Customers,
    Suppliers,
    CashMovements,
    Orders,
    Purchases,
    Transactions,
    Users,
    UserInvites,
    ActivityLogs,
    Settings,
    Categories,
}

/// How ids are minted for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Decimal integer from the sequence allocator.
    Sequence,
    /// UUID v4.
    Uuid,
}

impl Collection {
    pub const ALL: [Collection; 12] = [
        Collection::Products,
        Collection::Customers,
        Collection::Suppliers,
        Collection::CashMovements,
        Collection::Orders,
        Collection::Purchases,
        Collection::Transactions,
        Collection::Users,
        Collection::UserInvites,
        Collection::ActivityLogs,
        Collection::Settings,
        Collection::Categories,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Customers => "customers",
            Collection::Suppliers => "suppliers",
            Collection::CashMovements => "cashMovements",
            Collection::Orders => "orders",
            Collection::Purchases => "purchases",
            Collection::Transactions => "transactions",
            Collection::Users => "users",
            Collection::UserInvites => "userInvites",
            Collection::ActivityLogs => "activityLogs",
            Collection::Settings => "settings",
            Collection::Categories => "categories",
        }
    }

    pub fn from_key(key: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.key() == key)
    }

    pub fn id_kind(&self) -> IdKind {
        match self {
            Collection::Users | Collection::UserInvites | Collection::ActivityLogs => IdKind::Uuid,
            _ => IdKind::Sequence,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// Entity Trait
// =============================================================================

/// A record stored in one of the dataset's collections.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    fn all(dataset: &Dataset) -> &Vec<Self>;
    fn all_mut(dataset: &mut Dataset) -> &mut Vec<Self>;

    /// Field checks run before the entity is stored through a mutator.
    fn validate(&self) -> ValidationResult<()> {
        Ok(())
    }
}

/// Entities removed from their collection on delete.
///
/// Transactions are not: they are cancelled through the ledger.
pub trait PhysicallyDeletable: Entity {}

macro_rules! impl_entity {
    ($ty:ty, $collection:expr, $field:ident $(, $validate:path)?) => {
        impl Entity for $ty {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn all(dataset: &Dataset) -> &Vec<Self> {
                &dataset.$field
            }

            fn all_mut(dataset: &mut Dataset) -> &mut Vec<Self> {
                &mut dataset.$field
            }

            $(
                fn validate(&self) -> ValidationResult<()> {
                    $validate(self)
                }
            )?
        }
    };
}

impl_entity!(Product, Collection::Products, products, validate_product);
impl_entity!(Customer, Collection::Customers, customers, validate_customer);
impl_entity!(Supplier, Collection::Suppliers, suppliers);
impl_entity!(CashMovement, Collection::CashMovements, cash_movements);
impl_entity!(Order, Collection::Orders, orders);
impl_entity!(Purchase, Collection::Purchases, purchases);
impl_entity!(Transaction, Collection::Transactions, transactions);
impl_entity!(User, Collection::Users, users);
impl_entity!(UserInvite, Collection::UserInvites, user_invites);
impl_entity!(ActivityLog, Collection::ActivityLogs, activity_logs);

impl PhysicallyDeletable for Product {}
impl PhysicallyDeletable for Customer {}
impl PhysicallyDeletable for Supplier {}
impl PhysicallyDeletable for CashMovement {}
impl PhysicallyDeletable for Order {}
impl PhysicallyDeletable for Purchase {}
impl PhysicallyDeletable for User {}
impl PhysicallyDeletable for UserInvite {}
impl PhysicallyDeletable for ActivityLog {}

// =============================================================================
// Dataset
// =============================================================================

/// Every collection of one station. This is the in-memory source of truth.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    pub products: Vec<Product>,
    pub customers: Vec<Customer>,
    pub suppliers: Vec<Supplier>,
    pub cash_movements: Vec<CashMovement>,
    pub orders: Vec<Order>,
    pub purchases: Vec<Purchase>,
    pub transactions: Vec<Transaction>,
    pub users: Vec<User>,
    pub user_invites: Vec<UserInvite>,
    pub activity_logs: Vec<ActivityLog>,
    pub settings: Settings,
    pub categories: Vec<String>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Generic entity access
    // -------------------------------------------------------------------------

    pub fn find<E: Entity>(&self, id: &str) -> Option<&E> {
        E::all(self).iter().find(|e| e.id() == id)
    }

    pub fn find_mut<E: Entity>(&mut self, id: &str) -> Option<&mut E> {
        E::all_mut(self).iter_mut().find(|e| e.id() == id)
    }

    /// Mints an id for the entity's collection.
    pub fn allocate_id<E: Entity>(&self) -> String {
        match E::COLLECTION.id_kind() {
            IdKind::Sequence => next_id(
                E::all(self),
                self.settings.sequences.offset_for(E::COLLECTION),
            ),
            IdKind::Uuid => Uuid::new_v4().to_string(),
        }
    }

    /// Inserts or replaces an entity, allocating an id when it has none.
    /// Returns the id.
    pub fn upsert<E: Entity>(&mut self, mut entity: E) -> String {
        if entity.id().trim().is_empty() {
            let id = self.allocate_id::<E>();
            entity.set_id(id);
        }
        let id = entity.id().to_string();
        let items = E::all_mut(self);
        match items.iter_mut().find(|e| e.id() == id) {
            Some(existing) => *existing = entity,
            None => items.push(entity),
        }
        id
    }

    /// Removes an entity by id.
    pub fn remove<E: PhysicallyDeletable>(&mut self, id: &str) -> Option<E> {
        let items = E::all_mut(self);
        let pos = items.iter().position(|e| e.id() == id)?;
        Some(items.remove(pos))
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    /// Full snapshot for a push.
    pub fn to_snapshot(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Serialized value of one collection, as persisted under its key.
    pub fn collection_value(&self, collection: Collection) -> serde_json::Result<Value> {
        match collection {
            Collection::Products => serde_json::to_value(&self.products),
            Collection::Customers => serde_json::to_value(&self.customers),
            Collection::Suppliers => serde_json::to_value(&self.suppliers),
            Collection::CashMovements => serde_json::to_value(&self.cash_movements),
            Collection::Orders => serde_json::to_value(&self.orders),
            Collection::Purchases => serde_json::to_value(&self.purchases),
            Collection::Transactions => serde_json::to_value(&self.transactions),
            Collection::Users => serde_json::to_value(&self.users),
            Collection::UserInvites => serde_json::to_value(&self.user_invites),
            Collection::ActivityLogs => serde_json::to_value(&self.activity_logs),
            Collection::Settings => serde_json::to_value(&self.settings),
            Collection::Categories => serde_json::to_value(&self.categories),
        }
    }

    /// Applies a remote snapshot field by field.
    ///
    /// Array fields replace the local collection when present and well
    /// typed; anything else keeps the local value. Settings are merged over
    /// the defaults. Returns the collections that changed.
    pub fn apply_remote(&mut self, remote: &Value) -> Vec<Collection> {
        let mut applied = Vec::new();

        for collection in Collection::ALL {
            let Some(value) = remote.get(collection.key()) else {
                continue;
            };
            let replaced = match collection {
                Collection::Settings => {
                    if value.is_object() {
                        self.settings = Settings::merged_from(value);
                        true
                    } else {
                        false
                    }
                }
                Collection::Products => replace_array(&mut self.products, value),
                Collection::Customers => replace_array(&mut self.customers, value),
                Collection::Suppliers => replace_array(&mut self.suppliers, value),
                Collection::CashMovements => replace_array(&mut self.cash_movements, value),
                Collection::Orders => replace_array(&mut self.orders, value),
                Collection::Purchases => replace_array(&mut self.purchases, value),
                Collection::Transactions => replace_array(&mut self.transactions, value),
                Collection::Users => replace_array(&mut self.users, value),
                Collection::UserInvites => replace_array(&mut self.user_invites, value),
                Collection::ActivityLogs => replace_array(&mut self.activity_logs, value),
                Collection::Categories => replace_array(&mut self.categories, value),
            };
            if replaced {
                applied.push(collection);
            }
        }

        applied
    }

    /// Loads one persisted collection value into the dataset.
    ///
    /// Same acceptance rule as [`Dataset::apply_remote`]; returns false when
    /// the value was rejected.
    pub fn restore_collection(&mut self, collection: Collection, value: &Value) -> bool {
        let mut wrapper = serde_json::Map::new();
        wrapper.insert(collection.key().to_string(), value.clone());
        !self.apply_remote(&Value::Object(wrapper)).is_empty()
    }

    /// True when there is nothing a push could lose: no products and no
    /// customers.
    pub fn looks_empty(&self) -> bool {
        self.products.is_empty() && self.customers.is_empty()
    }
}

fn replace_array<T: DeserializeOwned>(target: &mut Vec<T>, value: &Value) -> bool {
    if !value.is_array() {
        return false;
    }
    match serde_json::from_value::<Vec<T>>(value.clone()) {
        Ok(items) => {
            *target = items;
            true
        }
        Err(_) => false,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use chrono::Utc;
    use serde_json::json;

    fn product(name: &str) -> Product {
        Product::new(name, Money::from_cents(250), 10, Utc::now())
    }

    #[test]
    fn test_upsert_allocates_sequence_ids() {
        let mut ds = Dataset::new();
        let a = ds.upsert(product("Cola"));
        let b = ds.upsert(product("Chips"));
        assert_eq!(a, "1");
        assert_eq!(b, "2");

        let mut renamed = ds.find::<Product>("1").cloned().unwrap();
        renamed.name = "Cola Zero".into();
        assert_eq!(ds.upsert(renamed), "1");
        assert_eq!(ds.products.len(), 2);
        assert_eq!(ds.products[0].name, "Cola Zero");
    }

    #[test]
    fn test_uuid_collections() {
        let mut ds = Dataset::new();
        let id = ds.upsert(ActivityLog {
            id: String::new(),
            user_id: None,
            action: "login".into(),
            details: None,
            created_at: Utc::now(),
        });
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_remove() {
        let mut ds = Dataset::new();
        let id = ds.upsert(product("Cola"));
        assert!(ds.remove::<Product>(&id).is_some());
        assert!(ds.remove::<Product>(&id).is_none());
    }

    #[test]
    fn test_apply_remote_replaces_only_well_typed_arrays() {
        let mut ds = Dataset::new();
        ds.upsert(product("Local"));
        ds.categories = vec!["Drinks".into()];

        let remote = json!({
            "products": [],
            "customers": "not an array",
            "categories": [1, 2, 3],
            "settings": { "store": { "name": "Remote Shop" } }
        });
        let applied = ds.apply_remote(&remote);

        assert!(ds.products.is_empty());
        assert_eq!(ds.categories, vec!["Drinks".to_string()]);
        assert_eq!(ds.settings.store.name, "Remote Shop");
        assert_eq!(applied, vec![Collection::Products, Collection::Settings]);
    }

    #[test]
    fn test_apply_remote_missing_fields_keep_local() {
        let mut ds = Dataset::new();
        ds.upsert(product("Local"));
        let applied = ds.apply_remote(&json!({}));
        assert!(applied.is_empty());
        assert_eq!(ds.products.len(), 1);
    }

    #[test]
    fn test_snapshot_uses_wire_names() {
        let ds = Dataset::new();
        let snap = ds.to_snapshot().unwrap();
        assert!(snap.get("cashMovements").is_some());
        assert!(snap.get("activityLogs").is_some());
        assert!(snap["settings"].get("cloudSync").is_some());
    }

    #[test]
    fn test_collection_keys_round_trip() {
        for c in Collection::ALL {
            assert_eq!(Collection::from_key(c.key()), Some(c));
        }
        assert_eq!(Collection::from_key("nope"), None);
    }
}
