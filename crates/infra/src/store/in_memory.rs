use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;

use autoshop_accounting::AccountBalances;
use autoshop_core::{GrnId, Page, SupplierId, Versioned};
use autoshop_inventory::{
    CostedItem, InventoryItemId, MovementFilter, SellingPriceChange, StockMovement,
    StockMovementId, catalog_key,
};
use autoshop_purchasing::{Grn, ItemReturn, ItemReturnId, Payment, Supplier};

use super::r#trait::{ChangeSet, LedgerStore, StoreError, StoredEvent};

/// Running totals after a change set, computed before anything is written.
struct Totals {
    balances: AccountBalances,
    supplier_due: HashMap<SupplierId, Decimal>,
}

#[derive(Debug)]
struct State {
    items: HashMap<InventoryItemId, Versioned<CostedItem>>,
    item_order: Vec<InventoryItemId>,
    suppliers: HashMap<SupplierId, Versioned<Supplier>>,
    grns: HashMap<GrnId, Versioned<Grn>>,
    returns: HashMap<ItemReturnId, Versioned<ItemReturn>>,
    movements: Vec<StockMovement>,
    payments: Vec<Payment>,
    selling_price_changes: Vec<SellingPriceChange>,
    balances: AccountBalances,
    outbox: Vec<StoredEvent>,
}

/// In-memory ledger store.
///
/// Commits take the write lock, validate the whole change set, then apply
/// it; a rejected change set leaves no trace. Intended for tests and
/// single-process deployments.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
}

impl InMemoryLedgerStore {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(State {
                items: HashMap::new(),
                item_order: Vec::new(),
                suppliers: HashMap::new(),
                grns: HashMap::new(),
                returns: HashMap::new(),
                movements: Vec::new(),
                payments: Vec::new(),
                selling_price_changes: Vec::new(),
                balances: AccountBalances::new(currency),
                outbox: Vec::new(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

fn next_version(current: Option<u64>) -> u64 {
    current.map_or(1, |v| v + 1)
}

impl State {
    fn validate(&self, changes: &ChangeSet) -> Result<Totals, StoreError> {
        for staged in &changes.items {
            let id = staged.value.item().id();
            let current = self.items.get(&id).map(|v| v.version);
            if !staged.expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "item {id}: expected {:?}, found {current:?}",
                    staged.expected
                )));
            }
        }
        self.validate_item_keys(changes)?;

        let mut staged_supplier_names = HashSet::new();
        for staged in &changes.suppliers {
            let supplier = &staged.value;
            let current = self.suppliers.get(&supplier.id).map(|v| v.version);
            if !staged.expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "supplier {}: expected {:?}, found {current:?}",
                    supplier.id, staged.expected
                )));
            }
            let key = catalog_key(&supplier.name);
            let taken = self
                .suppliers
                .values()
                .any(|s| s.value.id != supplier.id && catalog_key(&s.value.name) == key);
            if taken || !staged_supplier_names.insert(key) {
                return Err(StoreError::Conflict(format!(
                    "supplier name '{}' already taken",
                    supplier.name
                )));
            }
        }
        let mut trial_suppliers: HashMap<SupplierId, Supplier> = HashMap::new();
        for (supplier_id, delta) in &changes.supplier_due {
            let supplier = match trial_suppliers.entry(*supplier_id) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => e.insert(self.current_supplier(changes, *supplier_id)?.clone()),
            };
            supplier.adjust_due(*delta)?;
        }

        let mut staged_codes = HashSet::new();
        for staged in &changes.grns {
            let grn = &staged.value;
            let current = self.grns.get(&grn.id()).map(|v| v.version);
            if !staged.expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "grn {}: expected {:?}, found {current:?}",
                    grn.id(),
                    staged.expected
                )));
            }
            let key = catalog_key(grn.code());
            let taken = self
                .grns
                .values()
                .any(|g| g.value.id() != grn.id() && catalog_key(g.value.code()) == key);
            if taken || !staged_codes.insert(key) {
                return Err(StoreError::Conflict(format!(
                    "grn code '{}' already taken",
                    grn.code()
                )));
            }
        }

        let mut live_origins = HashSet::new();
        for staged in &changes.returns {
            let ret = &staged.value;
            let current = self.returns.get(&ret.id()).map(|v| v.version);
            if !staged.expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "return {}: expected {:?}, found {current:?}",
                    ret.id(),
                    staged.expected
                )));
            }
            if !ret.is_live() {
                continue;
            }
            let clash = self.returns.values().any(|r| {
                r.value.id() != ret.id()
                    && r.value.origin_movement() == ret.origin_movement()
                    && r.value.is_live()
            });
            if clash || !live_origins.insert(ret.origin_movement()) {
                return Err(StoreError::Conflict(format!(
                    "movement {} already has a live return",
                    ret.origin_movement()
                )));
            }
        }

        let mut balances = self.balances.clone();
        for posting in &changes.postings {
            balances.post(posting)?;
        }
        Ok(Totals {
            balances,
            supplier_due: trial_suppliers
                .into_iter()
                .map(|(id, s)| (id, s.due_amount))
                .collect(),
        })
    }

    /// Staged copy first, then the stored one.
    fn current_supplier<'a>(
        &'a self,
        changes: &'a ChangeSet,
        id: SupplierId,
    ) -> Result<&'a Supplier, StoreError> {
        changes
            .suppliers
            .iter()
            .map(|s| &s.value)
            .find(|s| s.id == id)
            .or_else(|| self.suppliers.get(&id).map(|v| &v.value))
            .ok_or_else(|| StoreError::Conflict(format!("supplier {id} does not exist")))
    }

    /// Item code and name stay unique across stored and staged items.
    fn validate_item_keys(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        if changes.items.is_empty() {
            return Ok(());
        }
        let staged: HashMap<InventoryItemId, &CostedItem> = changes
            .items
            .iter()
            .map(|s| (s.value.item().id(), &s.value))
            .collect();
        let view: Vec<&CostedItem> = self
            .items
            .iter()
            .filter(|(id, _)| !staged.contains_key(id))
            .map(|(_, v)| &v.value)
            .chain(staged.values().copied())
            .collect();

        for candidate in staged.values() {
            let item = candidate.item();
            let collision = view.iter().any(|other| {
                other.item().id() != item.id() && other.item().collides_with(item.code(), item.name())
            });
            if collision {
                return Err(StoreError::Conflict(format!(
                    "item code '{}' or name '{}' already taken",
                    item.code(),
                    item.name()
                )));
            }
        }
        Ok(())
    }

    fn apply(&mut self, changes: ChangeSet, totals: Totals) -> Vec<StoredEvent> {
        for staged in changes.items {
            let id = staged.value.item().id();
            let version = next_version(self.items.get(&id).map(|v| v.version));
            if version == 1 {
                self.item_order.push(id);
            }
            self.items.insert(id, Versioned::new(staged.value, version));
        }
        for staged in changes.suppliers {
            let id = staged.value.id;
            let version = next_version(self.suppliers.get(&id).map(|v| v.version));
            self.suppliers.insert(id, Versioned::new(staged.value, version));
        }
        for (supplier_id, due) in totals.supplier_due {
            if let Some(supplier) = self.suppliers.get_mut(&supplier_id) {
                supplier.value.due_amount = due;
            }
        }
        for staged in changes.grns {
            let id = staged.value.id();
            let version = next_version(self.grns.get(&id).map(|v| v.version));
            self.grns.insert(id, Versioned::new(staged.value, version));
        }
        for staged in changes.returns {
            let id = staged.value.id();
            let version = next_version(self.returns.get(&id).map(|v| v.version));
            self.returns.insert(id, Versioned::new(staged.value, version));
        }

        self.movements.extend(changes.movements);
        self.payments.extend(changes.payments);
        self.selling_price_changes.extend(changes.selling_price_changes);
        self.balances = totals.balances;

        let mut next = self.outbox.last().map_or(1, |e| e.sequence_number + 1);
        let mut committed = Vec::with_capacity(changes.events.len());
        for e in changes.events {
            let stored = StoredEvent {
                event_id: e.event_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            self.outbox.push(stored.clone());
            committed.push(stored);
        }
        committed
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn item(&self, id: InventoryItemId) -> Result<Option<Versioned<CostedItem>>, StoreError> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    fn item_by_code(&self, code: &str) -> Result<Option<Versioned<CostedItem>>, StoreError> {
        let key = catalog_key(code);
        Ok(self
            .read()?
            .items
            .values()
            .find(|v| catalog_key(v.value.item().code()) == key)
            .cloned())
    }

    fn conflicting_item(
        &self,
        code: &str,
        name: &str,
        exclude: Option<InventoryItemId>,
    ) -> Result<Option<CostedItem>, StoreError> {
        let state = self.read()?;
        Ok(state
            .item_order
            .iter()
            .filter(|id| Some(**id) != exclude)
            .filter_map(|id| state.items.get(id))
            .find(|v| v.value.item().collides_with(code, name))
            .map(|v| v.value.clone()))
    }

    fn items(&self) -> Result<Vec<CostedItem>, StoreError> {
        let state = self.read()?;
        Ok(state
            .item_order
            .iter()
            .filter_map(|id| state.items.get(id))
            .map(|v| v.value.clone())
            .collect())
    }

    fn supplier(&self, id: SupplierId) -> Result<Option<Versioned<Supplier>>, StoreError> {
        Ok(self.read()?.suppliers.get(&id).cloned())
    }

    fn supplier_by_name(&self, name: &str) -> Result<Option<Supplier>, StoreError> {
        let key = catalog_key(name);
        Ok(self
            .read()?
            .suppliers
            .values()
            .find(|s| catalog_key(&s.value.name) == key)
            .map(|s| s.value.clone()))
    }

    fn grn(&self, id: GrnId) -> Result<Option<Versioned<Grn>>, StoreError> {
        Ok(self.read()?.grns.get(&id).cloned())
    }

    fn grn_by_code(&self, code: &str) -> Result<Option<Versioned<Grn>>, StoreError> {
        let key = catalog_key(code);
        Ok(self
            .read()?
            .grns
            .values()
            .find(|g| catalog_key(g.value.code()) == key)
            .cloned())
    }

    fn grn_count(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.grns.len() as u64)
    }

    fn item_return(&self, id: ItemReturnId) -> Result<Option<Versioned<ItemReturn>>, StoreError> {
        Ok(self.read()?.returns.get(&id).cloned())
    }

    fn returns_for_movement(&self, id: StockMovementId) -> Result<Vec<ItemReturn>, StoreError> {
        let mut returns: Vec<ItemReturn> = self
            .read()?
            .returns
            .values()
            .filter(|r| r.value.origin_movement() == id)
            .map(|r| r.value.clone())
            .collect();
        returns.sort_by_key(|r| r.created_at());
        Ok(returns)
    }

    fn movement(&self, id: StockMovementId) -> Result<Option<StockMovement>, StoreError> {
        Ok(self.read()?.movements.iter().find(|m| m.id == id).cloned())
    }

    fn movements(
        &self,
        filter: &MovementFilter,
        page: Page,
    ) -> Result<Vec<StockMovement>, StoreError> {
        let state = self.read()?;
        Ok(page.slice(state.movements.iter().filter(|m| filter.matches(m)).cloned()))
    }

    fn payments(&self, supplier_id: SupplierId) -> Result<Vec<Payment>, StoreError> {
        Ok(self
            .read()?
            .payments
            .iter()
            .filter(|p| p.supplier_id == supplier_id)
            .cloned()
            .collect())
    }

    fn selling_price_history(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<SellingPriceChange>, StoreError> {
        Ok(self
            .read()?
            .selling_price_changes
            .iter()
            .filter(|c| c.item_id == item_id)
            .cloned()
            .collect())
    }

    fn balances(&self) -> Result<AccountBalances, StoreError> {
        Ok(self.read()?.balances.clone())
    }

    fn events_since(&self, after: u64, limit: usize) -> Result<Vec<StoredEvent>, StoreError> {
        Ok(self
            .read()?
            .outbox
            .iter()
            .filter(|e| e.sequence_number > after)
            .take(limit)
            .cloned()
            .collect())
    }

    fn commit(&self, changes: ChangeSet) -> Result<Vec<StoredEvent>, StoreError> {
        let mut state = self.write()?;
        let totals = state.validate(&changes)?;
        Ok(state.apply(changes, totals))
    }
}
