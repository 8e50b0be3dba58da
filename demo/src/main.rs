use anyhow::Result;
use ddd_macros::event;
use ddd_persist::aggregate::Aggregate;
use ddd_persist::aggregate_root::AggregateRoot;
use ddd_persist::domain_event::{AnyEvent, EventRegistry};
use ddd_persist::error::{DomainError, DomainResult};
use ddd_persist::eventing::InMemoryEventBus;
use ddd_persist::persist::{
    InMemoryLockClient, InMemoryStorage, LoadOptions, Repository, SnapshotStore,
};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[event(event_type = "account.opened")]
struct Opened {
    owner: String,
}

// 事件携带变更后的余额，重复回放结果不变
#[event(event_type = "account.deposited")]
struct Deposited {
    amount: i64,
    balance: i64,
}

#[event(event_type = "account.withdrawn")]
struct Withdrawn {
    amount: i64,
    balance: i64,
}

#[event(event_type = "account.snapshot")]
struct AccountSnapshot {
    owner: String,
    balance: i64,
}

#[derive(Debug, Clone, Default)]
struct Account {
    owner: Option<String>,
    balance: i64,
}

impl Aggregate for Account {
    const TYPE: &'static str = "account";

    fn register(registry: &mut EventRegistry<Self>) {
        registry
            .on(|state: &mut Self, event: &Opened| state.owner = Some(event.owner.clone()))
            .on(|state: &mut Self, event: &Deposited| state.balance = event.balance)
            .on(|state: &mut Self, event: &Withdrawn| state.balance = event.balance)
            .on(|state: &mut Self, event: &AccountSnapshot| {
                state.owner = Some(event.owner.clone());
                state.balance = event.balance;
            });
    }

    fn snapshot(&self) -> Option<AnyEvent> {
        let owner = self.owner.clone()?;
        Some(AnyEvent::new(AccountSnapshot {
            owner,
            balance: self.balance,
        }))
    }
}

trait AccountCommands {
    fn open(&mut self, owner: &str) -> DomainResult<()>;
    fn deposit(&mut self, amount: i64) -> DomainResult<()>;
    fn withdraw(&mut self, amount: i64) -> DomainResult<()>;
}

impl AccountCommands for AggregateRoot<Account> {
    fn open(&mut self, owner: &str) -> DomainResult<()> {
        if self.state().owner.is_some() {
            return Err(invalid("account already opened"));
        }
        self.apply(Opened {
            owner: owner.to_string(),
        })
    }

    fn deposit(&mut self, amount: i64) -> DomainResult<()> {
        if amount <= 0 {
            return Err(invalid("deposit must be positive"));
        }
        let balance = self.state().balance + amount;
        self.apply(Deposited { amount, balance })
    }

    fn withdraw(&mut self, amount: i64) -> DomainResult<()> {
        if self.state().balance < amount {
            return Err(invalid("insufficient funds"));
        }
        let balance = self.state().balance - amount;
        self.apply(Withdrawn { amount, balance })
    }
}

fn invalid(reason: &str) -> DomainError {
    DomainError::InvalidState {
        reason: reason.to_string(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ddd_persist=debug")),
        )
        .init();

    let storage = Arc::new(InMemoryStorage::new());
    let locks = Arc::new(InMemoryLockClient::new());
    let bus = Arc::new(InMemoryEventBus::default());

    let mut published = bus.subscribe();
    let listener = tokio::spawn(async move {
        let mut seen = 0usize;
        while let Some(Ok(event)) = published.next().await {
            seen += 1;
            tracing::info!(event_type = event.event_type(), seen, "event published");
        }
    });

    let repository: Repository<Account> = Repository::builder()
        .stream("account")
        .storage(storage.clone())
        .lock_client(locks.clone())
        .publisher(bus.clone())
        .build();

    // 开户并连续存款，第 10 次提交处产生快照
    let mut account = repository.create(None);
    let account_id = account.id().to_string();
    account.open("alice")?;
    repository.commit(&mut account).await?;

    for amount in 1..=11 {
        let mut account = repository
            .load_from_snapshot(&account_id, LoadOptions::default())
            .await?;
        account.deposit(amount * 10)?;
        repository.commit(&mut account).await?;
    }

    let account = repository
        .load_from_snapshot(&account_id, LoadOptions::unlocked())
        .await?;
    tracing::info!(
        balance = account.state().balance,
        replayed = account.loaded_event_nodes().len(),
        snapshots = storage.rows(&repository.snapshot_table()).len(),
        "account restored from snapshot"
    );

    // 业务校验失败时释放锁
    let mut account = repository
        .load(&account_id, LoadOptions::default())
        .await?;
    let rejected = repository
        .run(&mut account, |account| account.withdraw(1_000_000))
        .await;
    tracing::info!(error = ?rejected.err(), "overdraft rejected, lock released");

    let mut account = repository
        .load(&account_id, LoadOptions::default())
        .await?;
    repository
        .run(&mut account, |account| account.withdraw(100))
        .await?;
    repository.commit(&mut account).await?;
    tracing::info!(balance = account.state().balance, "withdrawal committed");

    // 只保留最新状态的快照存储
    let store: SnapshotStore<Account> = SnapshotStore::builder()
        .stream("account_state")
        .storage(storage.clone())
        .publisher(bus.clone())
        .build();
    let mut summary = store.create(Some(account_id.as_str()));
    summary.open("alice")?;
    summary.deposit(42)?;
    store.commit(&mut summary).await?;
    let summary = store.load(&account_id).await?;
    tracing::info!(balance = summary.state().balance, "state row restored");

    drop(repository);
    drop(store);
    drop(bus);
    listener.await?;
    Ok(())
}
