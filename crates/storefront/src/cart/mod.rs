//! The cart store.
//!
//! [`CartStore`] owns the current cart and is the only way to change it.
//! Where the cart lives is decided by the [`CartBackend`] chosen when the
//! store is built:
//!
//! - [`LocalCartBackend`] - JSON array in the `kp-cart` slot, no network
//! - [`RemoteCartBackend`] - WooCommerce server cart over GraphQL
//!
//! Mutations run one at a time; a call made while another is in flight
//! waits for it. Consumers read [`CartSnapshot`]s, either on demand with
//! [`CartStore::read`] or as they change with [`CartStore::subscribe`].

mod backend;
mod error;
mod local;
mod remote;

pub use backend::{CartBackend, CartMutation, CartState};
pub use error::CartError;
pub use local::{CART_SLOT, LocalCartBackend};
pub use remote::{RemoteCartApi, RemoteCartBackend};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use kp_core::{Cart, LineItem, LineKey, ProductInput, clamp_quantity};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, instrument};

use crate::error::add_breadcrumb;
use crate::graphql::CartTotals;

/// An immutable view of the cart at one moment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Line items in display order.
    pub items: Vec<LineItem>,
    /// Sum of `unit_price * quantity` over the items.
    pub total: Decimal,
    /// Sum of quantities over the items.
    pub count: u64,
    /// Whether a mutation is in flight.
    pub busy: bool,
    /// Totals computed by the server (remote mode only).
    pub server_totals: Option<CartTotals>,
}

impl CartSnapshot {
    fn new(state: &CartState, busy: bool) -> Self {
        Self {
            items: state.cart.items().to_vec(),
            total: state.cart.total(),
            count: state.cart.count(),
            busy,
            server_totals: state.server_totals.clone(),
        }
    }

    /// Look up a line by key.
    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.key == key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Shared handle to the cart. Clones refer to the same cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    backend: Arc<dyn CartBackend>,
    state: RwLock<CartState>,
    /// Held for the duration of each mutation.
    in_flight: Mutex<()>,
    busy: AtomicBool,
    updates: watch::Sender<CartSnapshot>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("backend", &self.inner.backend.name())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Sets the busy flag for its lifetime and publishes on release.
struct BusyGuard<'a> {
    inner: &'a CartStoreInner,
}

impl<'a> BusyGuard<'a> {
    fn engage(inner: &'a CartStoreInner) -> Self {
        inner.busy.store(true, Ordering::SeqCst);
        inner.publish();
        Self { inner }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.inner.busy.store(false, Ordering::SeqCst);
        self.inner.publish();
    }
}

impl CartStoreInner {
    fn snapshot(&self) -> CartSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        CartSnapshot::new(&state, self.busy.load(Ordering::SeqCst))
    }

    fn cart(&self) -> Cart {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cart
            .clone()
    }

    fn replace(&self, state: CartState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }
}

impl CartStore {
    /// Create a store with an empty cart, without touching the backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CartBackend>) -> Self {
        Self::with_state(backend, CartState::default())
    }

    fn with_state(backend: Arc<dyn CartBackend>, state: CartState) -> Self {
        let (updates, _) = watch::channel(CartSnapshot::new(&state, false));
        Self {
            inner: Arc::new(CartStoreInner {
                backend,
                state: RwLock::new(state),
                in_flight: Mutex::new(()),
                busy: AtomicBool::new(false),
                updates,
            }),
        }
    }

    /// Create a store holding whatever the backend currently has.
    ///
    /// A backend that fails to load yields an empty cart; the failure is
    /// logged.
    pub async fn load(backend: Arc<dyn CartBackend>) -> Self {
        let state = match backend.load().await {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, backend = backend.name(), "Failed to load cart; starting empty");
                CartState::default()
            }
        };
        info!(
            backend = backend.name(),
            lines = state.cart.items().len(),
            "Cart loaded"
        );
        Self::with_state(backend, state)
    }

    /// Name of the backend in use (`local` or `remote`).
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }

    /// The current cart with freshly computed totals.
    #[must_use]
    pub fn read(&self) -> CartSnapshot {
        self.inner.snapshot()
    }

    /// Whether a mutation round trip is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    /// Receive a snapshot after every change, including busy transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Add one unit of a product.
    ///
    /// An existing line for the product gains one unit and takes the new
    /// name, price, and image.
    ///
    /// In remote mode the server prices the line, so the product's own
    /// price is not consulted.
    ///
    /// # Errors
    ///
    /// In local mode, returns [`CartError::InvalidPrice`] if the product's
    /// price is not a valid amount and [`CartError::Overflow`] if the new
    /// total cannot be represented; the cart is unchanged either way.
    /// Otherwise returns a backend error.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&self, product: &ProductInput) -> Result<CartSnapshot, CartError> {
        self.mutate(CartMutation::Add(product.clone())).await
    }

    /// Set a line's quantity. Quantities below 1 become 1; unknown keys
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] if the new total cannot be
    /// represented, or an error if the backend fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn update_quantity(
        &self,
        key: &LineKey,
        quantity: i64,
    ) -> Result<CartSnapshot, CartError> {
        self.mutate(CartMutation::UpdateQuantity {
            key: key.clone(),
            quantity: clamp_quantity(quantity),
        })
        .await
    }

    /// Remove a line. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn remove_item(&self, key: &LineKey) -> Result<CartSnapshot, CartError> {
        self.mutate(CartMutation::Remove { key: key.clone() }).await
    }

    /// Reload the cart from the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails; the cart is unchanged.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CartSnapshot, CartError> {
        let _in_flight = self.inner.in_flight.lock().await;
        let busy = BusyGuard::engage(&self.inner);

        let result = match self.inner.backend.load().await {
            Ok(state) => {
                self.inner.replace(state);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Cart refresh failed");
                Err(e)
            }
        };
        drop(busy);
        result.map(|()| self.read())
    }

    async fn mutate(&self, mutation: CartMutation) -> Result<CartSnapshot, CartError> {
        let _in_flight = self.inner.in_flight.lock().await;

        let current = self.inner.cart();
        let key = mutation.key();
        if !mutation.applies_to(&current) {
            debug!(key = %key, "No such cart line; nothing to do");
            return Ok(self.read());
        }

        add_breadcrumb("cart", mutation.action(), Some(&[("key", key.as_str())]));

        let busy = BusyGuard::engage(&self.inner);
        let result = self.inner.backend.apply(&current, mutation).await;
        match result {
            Ok(state) => {
                self.inner.replace(state);
                drop(busy);
                Ok(self.read())
            }
            Err(e) => {
                error!(error = %e, backend = self.inner.backend.name(), "Cart update failed");
                drop(busy);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::graphql::{RemoteCart, RemoteCartItem, WooError};
    use crate::storage::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use kp_core::{ProductId, ProductImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    fn dress() -> ProductInput {
        ProductInput {
            id: ProductId::new(1),
            name: "Dress".to_string(),
            price: "2500".to_string(),
            images: vec![ProductImage {
                src: "/a.png".to_string(),
            }],
        }
    }

    fn product(id: i64, price: &str) -> ProductInput {
        ProductInput {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: price.to_string(),
            images: vec![],
        }
    }

    async fn local_store() -> (CartStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let backend = Arc::new(LocalCartBackend::new(storage.clone()));
        (CartStore::load(backend).await, storage)
    }

    // =========================================================================
    // Local mode
    // =========================================================================

    #[tokio::test]
    async fn test_dress_scenario() {
        let (store, _) = local_store().await;
        let key = LineKey::for_product(ProductId::new(1));

        let snap = store.add_item(&dress()).await.unwrap();
        assert_eq!(snap.items.len(), 1);
        assert_eq!(snap.items[0].quantity, 1);
        assert_eq!(snap.items[0].image(), "/a.png");
        assert_eq!(snap.total, Decimal::from(2500));

        let snap = store.add_item(&dress()).await.unwrap();
        assert_eq!(snap.items.len(), 1);
        assert_eq!(snap.items[0].quantity, 2);
        assert_eq!(snap.total, Decimal::from(5000));

        let snap = store.update_quantity(&key, 0).await.unwrap();
        assert_eq!(snap.items[0].quantity, 1);
        assert_eq!(snap.total, Decimal::from(2500));

        let snap = store.remove_item(&key).await.unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.total, Decimal::ZERO);
        assert_eq!(snap.count, 0);
    }

    #[tokio::test]
    async fn test_negative_quantity_clamps_to_one() {
        let (store, _) = local_store().await;
        store.add_item(&product(4, "99")).await.unwrap();
        let key = LineKey::for_product(ProductId::new(4));

        let snap = store.update_quantity(&key, -7).await.unwrap();
        assert_eq!(snap.get(&key).unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_key_is_noop() {
        let (store, storage) = local_store().await;
        store.add_item(&product(2, "10")).await.unwrap();
        let saved = storage.get(CART_SLOT).unwrap();

        let snap = store.remove_item(&LineKey::new("999")).await.unwrap();
        assert_eq!(snap.count, 1);
        assert_eq!(storage.get(CART_SLOT).unwrap(), saved);
    }

    #[tokio::test]
    async fn test_invalid_price_is_rejected() {
        let (store, storage) = local_store().await;
        store.add_item(&product(2, "10")).await.unwrap();

        for price in ["", "call us", "₹100 - ₹200", "-5"] {
            let err = store.add_item(&product(3, price)).await.unwrap_err();
            assert!(matches!(err, CartError::InvalidPrice { .. }), "{price:?}");
        }

        let snap = store.read();
        assert_eq!(snap.items.len(), 1);
        assert_eq!(snap.total, Decimal::from(10));
        let stored: Cart = serde_json::from_str(&storage.get(CART_SLOT).unwrap().unwrap()).unwrap();
        assert_eq!(stored.items().len(), 1);
    }

    #[tokio::test]
    async fn test_overflowing_quantity_is_rejected() {
        let (store, storage) = local_store().await;
        store.add_item(&product(1, "1")).await.unwrap();
        store
            .add_item(&product(2, "100000000000000000000"))
            .await
            .unwrap();
        let before = store.read();
        let saved = storage.get(CART_SLOT).unwrap();

        let key = LineKey::for_product(ProductId::new(2));
        let err = store.update_quantity(&key, i64::MAX).await.unwrap_err();
        assert!(matches!(err, CartError::Overflow));

        let snap = store.read();
        assert_eq!(snap, before);
        assert_eq!(storage.get(CART_SLOT).unwrap(), saved);
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn test_readd_takes_latest_name_and_price() {
        let (store, _) = local_store().await;
        store.add_item(&product(5, "100")).await.unwrap();

        let mut renamed = product(5, "120");
        renamed.name = "Product 5 (new season)".to_string();
        let snap = store.add_item(&renamed).await.unwrap();

        assert_eq!(snap.items[0].quantity, 2);
        assert_eq!(snap.items[0].name, "Product 5 (new season)");
        assert_eq!(snap.total, Decimal::from(240));
    }

    #[tokio::test]
    async fn test_local_cart_survives_reload() {
        let (store, storage) = local_store().await;
        store.add_item(&dress()).await.unwrap();
        store.add_item(&product(2, "350.50")).await.unwrap();
        let before = store.read();

        let backend = Arc::new(LocalCartBackend::new(storage));
        let reloaded = CartStore::load(backend).await;
        assert_eq!(reloaded.read(), before);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let (store, _) = local_store().await;
        let mut rx = store.subscribe();

        store.add_item(&dress()).await.unwrap();
        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.count, 1);
        assert!(!snap.busy);
    }

    #[tokio::test]
    async fn test_random_operations_keep_totals_in_sync() {
        let mut rng = StdRng::seed_from_u64(0x6b70_6361_7274);
        let (store, storage) = local_store().await;

        for step in 0..400 {
            let id = rng.random_range(1..=6_i64);
            let key = LineKey::for_product(ProductId::new(id));
            match rng.random_range(0..3) {
                0 => {
                    let price = rng.random_range(1..=5000_i64).to_string();
                    store.add_item(&product(id, &price)).await.unwrap();
                }
                1 => {
                    store
                        .update_quantity(&key, rng.random_range(-3..=12_i64))
                        .await
                        .unwrap();
                }
                _ => {
                    store.remove_item(&key).await.unwrap();
                }
            }

            let snap = store.read();
            let total: Decimal = snap.items.iter().map(LineItem::line_total).sum();
            let count: u64 = snap.items.iter().map(|i| u64::from(i.quantity)).sum();
            assert_eq!(snap.total, total, "total drifted at step {step}");
            assert_eq!(snap.count, count, "count drifted at step {step}");
            assert!(snap.items.iter().all(|i| i.quantity >= 1));

            let mut keys: Vec<_> = snap.items.iter().map(|i| i.key.clone()).collect();
            keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            keys.dedup();
            assert_eq!(keys.len(), snap.items.len(), "duplicate key at step {step}");

            let stored: Cart =
                serde_json::from_str(&storage.get(CART_SLOT).unwrap().unwrap_or_default())
                    .unwrap_or_default();
            assert_eq!(stored.items(), snap.items.as_slice());
        }
    }

    // =========================================================================
    // Remote mode
    // =========================================================================

    /// In-memory stand-in for the WooCommerce cart API.
    #[derive(Default)]
    struct FakeRemoteApi {
        lines: StdMutex<Vec<RemoteCartItem>>,
        calls: StdMutex<Vec<String>>,
        fail_mutations: bool,
        fail_fetch: bool,
        /// Blocks the next mutation until notified.
        gate: StdMutex<Option<Arc<Notify>>>,
    }

    impl FakeRemoteApi {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        async fn mutation(&self, call: String) -> Result<(), WooError> {
            self.calls.lock().unwrap().push(call);
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if self.fail_mutations {
                return Err(WooError::UserError("out of stock".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RemoteCartApi for FakeRemoteApi {
        async fn fetch_cart(&self) -> Result<RemoteCart, WooError> {
            self.calls.lock().unwrap().push("fetch".to_string());
            if self.fail_fetch {
                return Err(WooError::RateLimited(30));
            }
            Ok(RemoteCart {
                items: self.lines.lock().unwrap().clone(),
                totals: CartTotals::default(),
            })
        }

        async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<(), WooError> {
            self.mutation(format!("add:{product_id}:{quantity}")).await?;
            let mut lines = self.lines.lock().unwrap();
            if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
                line.quantity += quantity;
            } else {
                lines.push(RemoteCartItem {
                    key: LineKey::new(format!("hash-{product_id}")),
                    product_id,
                    name: format!("Server product {product_id}"),
                    price: Some("&#8377;1,000.00".to_string()),
                    image_url: None,
                    quantity,
                    total: None,
                });
            }
            Ok(())
        }

        async fn update_item_quantity(&self, key: &LineKey, quantity: u32) -> Result<(), WooError> {
            self.mutation(format!("update:{key}:{quantity}")).await?;
            let mut lines = self.lines.lock().unwrap();
            if let Some(line) = lines.iter_mut().find(|l| &l.key == key) {
                line.quantity = quantity;
            }
            Ok(())
        }

        async fn remove_item(&self, key: &LineKey) -> Result<(), WooError> {
            self.mutation(format!("remove:{key}")).await?;
            self.lines.lock().unwrap().retain(|l| &l.key != key);
            Ok(())
        }
    }

    fn remote_store(api: Arc<FakeRemoteApi>) -> CartStore {
        CartStore::new(Arc::new(RemoteCartBackend::new(api)))
    }

    async fn wait_until_busy(store: &CartStore) {
        while !store.is_busy() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_remote_add_is_one_mutation_then_one_fetch() {
        let api = Arc::new(FakeRemoteApi::default());
        let store = remote_store(api.clone());

        let snap = store.add_item(&dress()).await.unwrap();

        assert_eq!(api.calls(), ["add:1:1", "fetch"]);
        assert_eq!(snap.items[0].key.as_str(), "hash-1");
        assert_eq!(snap.items[0].name, "Server product 1");
        assert_eq!(snap.total, Decimal::from(1000));
        assert!(snap.server_totals.is_some());
    }

    #[tokio::test]
    async fn test_remote_update_and_remove_use_server_keys() {
        let api = Arc::new(FakeRemoteApi::default());
        let store = remote_store(api.clone());
        store.add_item(&dress()).await.unwrap();
        let key = LineKey::new("hash-1");

        let snap = store.update_quantity(&key, 0).await.unwrap();
        assert_eq!(snap.items[0].quantity, 1);
        let snap = store.remove_item(&key).await.unwrap();
        assert!(snap.is_empty());

        assert_eq!(
            api.calls(),
            ["add:1:1", "fetch", "update:hash-1:1", "fetch", "remove:hash-1", "fetch"]
        );
    }

    #[tokio::test]
    async fn test_remote_unknown_key_makes_no_calls() {
        let api = Arc::new(FakeRemoteApi::default());
        let store = remote_store(api.clone());

        store.update_quantity(&LineKey::new("nope"), 3).await.unwrap();
        store.remove_item(&LineKey::new("nope")).await.unwrap();
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_busy_during_round_trip_success() {
        let api = Arc::new(FakeRemoteApi::default());
        let gate = Arc::new(Notify::new());
        *api.gate.lock().unwrap() = Some(gate.clone());
        let store = remote_store(api.clone());
        assert!(!store.is_busy());

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.add_item(&dress()).await }
        });
        wait_until_busy(&store).await;
        assert!(store.read().busy);

        gate.notify_one();
        let snap = task.await.unwrap().unwrap();
        assert!(!snap.busy);
        assert!(!store.is_busy());
        assert_eq!(snap.count, 1);
    }

    #[tokio::test]
    async fn test_busy_cleared_after_failure_and_state_kept() {
        let api = Arc::new(FakeRemoteApi {
            fail_mutations: true,
            ..FakeRemoteApi::default()
        });
        let gate = Arc::new(Notify::new());
        *api.gate.lock().unwrap() = Some(gate.clone());
        let store = remote_store(api.clone());

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.add_item(&dress()).await }
        });
        wait_until_busy(&store).await;

        gate.notify_one();
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, CartError::Remote(_)));
        assert!(!store.is_busy());
        assert!(store.read().is_empty());
        assert_eq!(api.calls(), ["add:1:1"]);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_snapshot() {
        let api = Arc::new(FakeRemoteApi::default());
        let store = remote_store(api.clone());
        store.add_item(&product(2, "20")).await.unwrap();
        let before = store.read();

        let api = Arc::new(FakeRemoteApi {
            fail_fetch: true,
            ..FakeRemoteApi::default()
        });
        let failing = CartStore::with_state(
            Arc::new(RemoteCartBackend::new(api.clone())),
            CartState {
                cart: Cart::from_items(before.items.clone()),
                server_totals: before.server_totals.clone(),
            },
        );

        let err = failing.add_item(&dress()).await.unwrap_err();
        assert!(matches!(err, CartError::Remote(_)));
        assert_eq!(api.calls(), ["add:1:1", "fetch"]);
        assert_eq!(failing.read(), before);
        assert!(!failing.is_busy());
    }

    #[tokio::test]
    async fn test_remote_add_ignores_unparseable_catalog_price() {
        let api = Arc::new(FakeRemoteApi::default());
        let store = remote_store(api.clone());

        let snap = store.add_item(&product(1, "call us")).await.unwrap();

        assert_eq!(api.calls(), ["add:1:1", "fetch"]);
        assert_eq!(snap.count, 1);
        assert_eq!(snap.total, Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_overlapping_mutations_are_queued() {
        let api = Arc::new(FakeRemoteApi::default());
        let gate = Arc::new(Notify::new());
        *api.gate.lock().unwrap() = Some(gate.clone());
        let store = remote_store(api.clone());

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.add_item(&product(1, "10")).await }
        });
        wait_until_busy(&store).await;

        let second = tokio::spawn({
            let store = store.clone();
            async move { store.add_item(&product(2, "20")).await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(api.calls(), ["add:1:1"]);

        gate.notify_one();
        first.await.unwrap().unwrap();
        let snap = second.await.unwrap().unwrap();

        assert_eq!(api.calls(), ["add:1:1", "fetch", "add:2:1", "fetch"]);
        assert_eq!(snap.count, 2);
    }

    #[tokio::test]
    async fn test_refresh_replaces_state_from_server() {
        let api = Arc::new(FakeRemoteApi::default());
        let store = remote_store(api.clone());
        api.lines.lock().unwrap().push(RemoteCartItem {
            key: LineKey::new("abc"),
            product_id: ProductId::new(9),
            name: "Added elsewhere".to_string(),
            price: None,
            image_url: None,
            quantity: 2,
            total: Some("600.00".to_string()),
        });

        let snap = store.refresh().await.unwrap();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.total, Decimal::from(600));
        assert_eq!(api.calls(), ["fetch"]);
    }
}
