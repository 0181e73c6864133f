//! Shared test fixtures: an in-memory engine with scriptable gateway
//! and notifier doubles, plus seed helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use ledger_core::{Buyer, Order, Product, Shipment};
use ledger_db::repository::{generate_id, stock};
use ledger_db::{Database, DbConfig};
use ledger_engine::{
    Engine, EngineConfig, GatewayError, GatewayTransaction, NotifyError, PaymentGateway,
    ShipmentNotifier,
};

/// Gateway double. Counts calls, hands out deterministic handles, and
/// can be switched to fail.
pub struct TestGateway {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl TestGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(TestGateway {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for TestGateway {
    async fn create_transaction(&self, order: &Order) -> Result<GatewayTransaction, GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError("gateway unreachable".to_string()));
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayTransaction {
            external_handle: format!("trx-{n}"),
            redirect_url: Some(format!("https://pay.example/trx-{n}")),
            payload: Some(serde_json::json!({ "order": order.order_number, "attempt": n })),
        })
    }
}

/// Notifier double. Counts calls and can be switched to fail.
pub struct TestNotifier {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl TestNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(TestNotifier {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShipmentNotifier for TestNotifier {
    async fn notify_shipped(
        &self,
        _order: &Order,
        _shipment: &Shipment,
    ) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError("channel closed".to_string()));
        }
        Ok(())
    }
}

pub struct TestContext {
    pub engine: Engine,
    pub gateway: Arc<TestGateway>,
    pub notifier: Arc<TestNotifier>,
}

pub async fn setup() -> TestContext {
    init_tracing();

    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    db.products()
        .insert_location("loc-1", "Gudang Utama")
        .await
        .unwrap();

    let gateway = TestGateway::new();
    let notifier = TestNotifier::new();
    let engine = Engine::new(
        db,
        gateway.clone(),
        notifier.clone(),
        EngineConfig::default(),
    );

    TestContext {
        engine,
        gateway,
        notifier,
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn seed_buyer(db: &Database, credit_term_days: i64) -> Buyer {
    let now = Utc::now();
    let buyer = Buyer {
        id: generate_id(),
        name: "Warung Bu Sari".to_string(),
        credit_term_days,
        current_debt: 0,
        is_blocked: false,
        blocked_reason: None,
        created_at: now,
        updated_at: now,
    };
    db.buyers().insert(&buyer).await.unwrap();
    buyer
}

pub async fn seed_product(db: &Database, sku: &str, sell_price: i64) -> Product {
    let now = Utc::now();
    let product = Product {
        id: generate_id(),
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        sell_price,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap();
    product
}

pub async fn seed_stock(db: &Database, product_id: &str, qty: i64) {
    let mut tx = db.begin().await.unwrap();
    stock::receive(&mut tx, "loc-1", product_id, qty, "seed", "tester")
        .await
        .unwrap();
    tx.commit().await.unwrap();
}
