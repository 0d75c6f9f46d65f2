//! Shop sessions and the gold/inventory ledger.
//!
//! A confirmed purchase waits out a simulated payment delay before the
//! ledger is touched. The wait is a `DelayedTask` owned by the session, so
//! closing the shop (or dropping the session) abandons the payment and the
//! debit never happens.
use crate::catalog::CatalogEntry;
use crate::engine::DelayedTask;
use crate::world::{Interactable, InteractableKind};
use std::rc::Rc;
use thiserror::Error;

pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    #[error("no item selected")]
    NothingSelected,
    #[error("no item '{0}' in this shop")]
    UnknownEntry(String),
    #[error("not enough gold: {price} needed, {balance} available")]
    InsufficientFunds { balance: u32, price: u32 },
    #[error("a purchase is already processing")]
    AlreadyProcessing,
}

/// Gold balance plus everything bought so far
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    gold: u32,
    inventory: Vec<CatalogEntry>,
}

impl Ledger {
    pub fn new(gold: u32) -> Self {
        Ledger {
            gold,
            inventory: Vec::new(),
        }
    }

    pub fn gold(&self) -> u32 {
        self.gold
    }

    pub fn inventory(&self) -> &[CatalogEntry] {
        &self.inventory
    }

    /// Last `count` purchases, oldest first
    pub fn recent(&self, count: usize) -> &[CatalogEntry] {
        let start = self.inventory.len().saturating_sub(count);
        &self.inventory[start..]
    }

    pub fn can_afford(&self, entry: &CatalogEntry) -> bool {
        self.gold >= entry.price
    }

    /// Check and debit in one step, so the balance can't go negative.
    /// Returns the new balance.
    pub fn debit(&mut self, entry: &CatalogEntry) -> Result<u32, PurchaseError> {
        let remaining =
            self.gold
                .checked_sub(entry.price)
                .ok_or(PurchaseError::InsufficientFunds {
                    balance: self.gold,
                    price: entry.price,
                })?;
        self.gold = remaining;
        self.inventory.push(entry.clone());
        Ok(remaining)
    }
}

/// Handed out when a payment starts processing
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub entry_id: String,
    pub price: u32,
    pub due_at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub entry: CatalogEntry,
    pub balance: u32,
}

/// One visit to one shop
#[derive(Debug)]
pub struct CommerceSession {
    shop_id: String,
    shop_name: String,
    catalog: Rc<Vec<CatalogEntry>>,
    category: Option<String>,
    selected: Option<usize>,
    // catalog index being paid for
    pending: Option<DelayedTask<usize>>,
    delay_ms: f64,
}

impl CommerceSession {
    pub fn new(
        shop_id: impl Into<String>,
        shop_name: impl Into<String>,
        catalog: Rc<Vec<CatalogEntry>>,
        delay_ms: f64,
    ) -> Self {
        CommerceSession {
            shop_id: shop_id.into(),
            shop_name: shop_name.into(),
            catalog,
            category: None,
            selected: None,
            pending: None,
            delay_ms,
        }
    }

    /// A session for `object` if it is a stocked shop
    pub fn open(object: &Interactable, delay_ms: f64) -> Option<Self> {
        match (object.kind, &object.catalog) {
            (InteractableKind::Shop, Some(catalog)) => Some(CommerceSession::new(
                object.id.as_str(),
                object.label.as_str(),
                catalog.clone(),
                delay_ms,
            )),
            _ => None,
        }
    }

    pub fn shop_id(&self) -> &str {
        &self.shop_id
    }

    pub fn shop_name(&self) -> &str {
        &self.shop_name
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// "All" followed by each category in catalog order
    pub fn categories(&self) -> Vec<&str> {
        let mut categories = vec![ALL_CATEGORIES];
        for entry in self.catalog.iter() {
            if !categories.contains(&entry.category.as_str()) {
                categories.push(entry.category.as_str());
            }
        }
        categories
    }

    /// `None` or "All" shows everything
    pub fn set_category(&mut self, category: Option<&str>) {
        self.category = category
            .filter(|category| *category != ALL_CATEGORIES)
            .map(str::to_string);
    }

    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(ALL_CATEGORIES)
    }

    /// Step the filter to the next category, wrapping back to "All"
    pub fn next_category(&mut self) -> &str {
        let categories = self.categories();
        let current = categories
            .iter()
            .position(|category| *category == self.category())
            .unwrap_or(0);
        let next = categories[(current + 1) % categories.len()].to_string();
        self.set_category(Some(&next));
        self.category()
    }

    /// Catalog entries under the current category filter
    pub fn visible(&self) -> Vec<&CatalogEntry> {
        self.catalog
            .iter()
            .filter(|entry| match &self.category {
                Some(category) => entry.category == *category,
                None => true,
            })
            .collect()
    }

    pub fn select(&mut self, entry_id: &str) -> Result<&CatalogEntry, PurchaseError> {
        let index = self
            .catalog
            .iter()
            .position(|entry| entry.id == entry_id)
            .ok_or_else(|| PurchaseError::UnknownEntry(entry_id.to_string()))?;
        self.selected = Some(index);
        Ok(&self.catalog[index])
    }

    pub fn selected(&self) -> Option<&CatalogEntry> {
        self.selected.map(|index| &self.catalog[index])
    }

    pub fn is_processing(&self) -> bool {
        self.pending.as_ref().is_some_and(DelayedTask::is_pending)
    }

    /// Start paying for the selected entry. The ledger is only read here;
    /// the debit happens in `poll` once the delay has passed.
    pub fn confirm(&mut self, ledger: &Ledger, now: f64) -> Result<Ticket, PurchaseError> {
        if self.is_processing() {
            return Err(PurchaseError::AlreadyProcessing);
        }
        let index = self.selected.ok_or(PurchaseError::NothingSelected)?;
        let entry = &self.catalog[index];
        if !ledger.can_afford(entry) {
            return Err(PurchaseError::InsufficientFunds {
                balance: ledger.gold(),
                price: entry.price,
            });
        }
        log::debug!(
            "processing '{}' for {} gold at {}",
            entry.id,
            entry.price,
            self.shop_id
        );
        let task = DelayedTask::schedule(index, now, self.delay_ms);
        let ticket = Ticket {
            entry_id: entry.id.clone(),
            price: entry.price,
            due_at: task.due_at(),
        };
        self.pending = Some(task);
        Ok(ticket)
    }

    /// Select and confirm in one call
    pub fn purchase(&mut self, entry_id: &str, ledger: &Ledger, now: f64) -> Result<Ticket, PurchaseError> {
        if self.is_processing() {
            return Err(PurchaseError::AlreadyProcessing);
        }
        self.select(entry_id)?;
        self.confirm(ledger, now)
    }

    /// Finish a due purchase. `None` while nothing is due.
    pub fn poll(&mut self, ledger: &mut Ledger, now: f64) -> Option<Result<Receipt, PurchaseError>> {
        let index = self.pending.as_mut()?.poll(now)?;
        self.pending = None;
        let entry = &self.catalog[index];
        let outcome = ledger.debit(entry).map(|balance| Receipt {
            entry: entry.clone(),
            balance,
        });
        match &outcome {
            Ok(receipt) => {
                self.selected = None;
                log::info!(
                    "bought '{}' at {}, {} gold left",
                    receipt.entry.display_name,
                    self.shop_name,
                    receipt.balance
                );
            }
            Err(err) => log::warn!("purchase of '{}' failed: {}", entry.id, err),
        }
        Some(outcome)
    }

    /// Leave the shop. A payment still processing is abandoned; returns
    /// true if one was.
    pub fn close(mut self) -> bool {
        let abandoned = self
            .pending
            .as_mut()
            .and_then(DelayedTask::cancel)
            .is_some();
        if abandoned {
            log::debug!("closed {} with a purchase in flight, cancelled", self.shop_id);
        }
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, category: &str, price: u32) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            name: id.to_string(),
            display_name: id.to_string(),
            category: category.to_string(),
            price,
            description: String::new(),
            images: vec![format!("/ProductImages/{id}.png")],
        }
    }

    fn session() -> CommerceSession {
        let catalog = vec![
            entry("sword", "Weapons", 150),
            entry("potion", "Potions", 20),
            entry("axe", "Weapons", 300),
        ];
        CommerceSession::new("armory", "The Armory", Rc::new(catalog), 1500.0)
    }

    #[test]
    fn purchase_debits_after_delay() {
        let mut ledger = Ledger::new(1000);
        let mut shop = session();
        let ticket = shop.purchase("sword", &ledger, 0.0).unwrap();
        assert_eq!(ticket.price, 150);
        assert_eq!(ticket.due_at, 1_500.0);
        assert!(shop.is_processing());
        assert!(shop.poll(&mut ledger, 1_499.0).is_none());
        assert_eq!(ledger.gold(), 1000);

        let receipt = shop.poll(&mut ledger, 1_500.0).unwrap().unwrap();
        assert_eq!(receipt.balance, 850);
        assert_eq!(ledger.gold(), 850);
        assert_eq!(ledger.inventory().len(), 1);
        assert_eq!(ledger.inventory()[0].id, "sword");
        assert!(shop.selected().is_none());
        assert!(!shop.is_processing());
    }

    #[test]
    fn insufficient_funds_changes_nothing() {
        let mut ledger = Ledger::new(100);
        let mut shop = session();
        let err = shop.purchase("sword", &ledger, 0.0).unwrap_err();
        assert_eq!(
            err,
            PurchaseError::InsufficientFunds {
                balance: 100,
                price: 150
            }
        );
        assert!(!shop.is_processing());
        assert!(shop.poll(&mut ledger, 10_000.0).is_none());
        assert_eq!(ledger.gold(), 100);
        assert!(ledger.inventory().is_empty());
    }

    #[test]
    fn double_confirm_debits_once() {
        let mut ledger = Ledger::new(1000);
        let mut shop = session();
        shop.select("sword").unwrap();
        shop.confirm(&ledger, 0.0).unwrap();
        assert_eq!(shop.confirm(&ledger, 10.0), Err(PurchaseError::AlreadyProcessing));
        assert_eq!(
            shop.purchase("potion", &ledger, 20.0),
            Err(PurchaseError::AlreadyProcessing)
        );
        assert_eq!(shop.selected().map(|e| e.id.as_str()), Some("sword"));

        shop.poll(&mut ledger, 1_500.0).unwrap().unwrap();
        assert!(shop.poll(&mut ledger, 3_000.0).is_none());
        assert_eq!(ledger.gold(), 850);
        assert_eq!(ledger.inventory().len(), 1);
    }

    #[test]
    fn closing_mid_processing_cancels_debit() {
        let ledger = Ledger::new(1000);
        let mut shop = session();
        shop.purchase("axe", &ledger, 0.0).unwrap();
        assert!(shop.close());
        assert_eq!(ledger.gold(), 1000);
        assert!(ledger.inventory().is_empty());
    }

    #[test]
    fn closing_idle_shop_cancels_nothing() {
        assert!(!session().close());
    }

    #[test]
    fn confirm_without_selection() {
        let ledger = Ledger::new(1000);
        let mut shop = session();
        assert_eq!(shop.confirm(&ledger, 0.0), Err(PurchaseError::NothingSelected));
    }

    #[test]
    fn unknown_entry_is_rejected() {
        let ledger = Ledger::new(1000);
        let mut shop = session();
        assert_eq!(
            shop.purchase("dragon", &ledger, 0.0),
            Err(PurchaseError::UnknownEntry("dragon".to_string()))
        );
    }

    #[test]
    fn selecting_never_touches_ledger() {
        let ledger = Ledger::new(1000);
        let mut shop = session();
        shop.select("axe").unwrap();
        shop.select("potion").unwrap();
        assert_eq!(ledger, Ledger::new(1000));
        assert_eq!(shop.selected().unwrap().id, "potion");
    }

    #[test]
    fn balance_never_goes_negative() {
        let mut ledger = Ledger::new(100);
        let axe = entry("axe", "Weapons", 300);
        assert!(ledger.debit(&axe).is_err());
        assert_eq!(ledger.gold(), 100);
        let potion = entry("potion", "Potions", 100);
        assert_eq!(ledger.debit(&potion), Ok(0));
        assert!(ledger.debit(&potion).is_err());
        assert_eq!(ledger.gold(), 0);
    }

    #[test]
    fn category_filter_is_a_view() {
        let ledger = Ledger::new(1000);
        let mut shop = session();
        assert_eq!(shop.categories(), vec!["All", "Weapons", "Potions"]);

        shop.set_category(Some("Weapons"));
        let ids: Vec<&str> = shop.visible().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["sword", "axe"]);
        assert_eq!(shop.category(), "Weapons");

        shop.set_category(Some("All"));
        assert_eq!(shop.visible().len(), 3);
        assert_eq!(ledger.gold(), 1000);
    }

    #[test]
    fn next_category_cycles_through_all() {
        let ledger = Ledger::new(1000);
        let mut shop = session();
        assert_eq!(shop.next_category(), "Weapons");
        assert_eq!(shop.visible().len(), 2);
        assert_eq!(shop.next_category(), "Potions");
        assert_eq!(shop.visible()[0].id, "potion");
        assert_eq!(shop.next_category(), "All");
        assert_eq!(shop.visible().len(), 3);
        assert_eq!(ledger.gold(), 1000);
    }

    #[test]
    fn recent_returns_tail() {
        let mut ledger = Ledger::new(1000);
        for id in ["a", "b", "c", "d"] {
            ledger.debit(&entry(id, "Misc", 1)).unwrap();
        }
        let recent: Vec<&str> = ledger.recent(3).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(recent, vec!["b", "c", "d"]);
        assert_eq!(Ledger::new(5).recent(3).len(), 0);
    }
}
