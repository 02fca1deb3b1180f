//! Derives the authoritative current balance per account from the full
//! snapshot history. The current balance is never stored: it is always the
//! snapshot with the latest generation timestamp within its account group,
//! after collapsing re-recorded observations.

use std::collections::HashMap;

use models::BalanceSnapshot;

/// Grouping key of an account across files: institution, branch, account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountKey {
    pub banco_codigo: String,
    pub agencia: String,
    pub conta: String,
}

impl AccountKey {
    fn of(snapshot: &BalanceSnapshot) -> Self {
        Self {
            banco_codigo: snapshot.banco_codigo.clone(),
            agencia: snapshot.agencia.clone(),
            conta: snapshot.conta.clone(),
        }
    }
}

/// Drops snapshots that are the same observation recorded twice: same
/// account, same generation date (time of day ignored) and same value.
/// The first occurrence wins.
pub fn dedup_snapshots(snapshots: Vec<BalanceSnapshot>) -> Vec<BalanceSnapshot> {
    let mut seen: Vec<(AccountKey, chrono::NaiveDate, f64)> = Vec::new();
    let mut out = Vec::new();

    for snapshot in snapshots {
        let entry = (
            AccountKey::of(&snapshot),
            snapshot.dt_geracao.date(),
            snapshot.valor,
        );
        if seen.contains(&entry) {
            continue;
        }
        seen.push(entry);
        out.push(snapshot);
    }

    out
}

/// Derives the current balance of every account in the history.
///
/// Within each (institution, branch, account) group the snapshot with the
/// latest generation timestamp wins; ties break on the latest upload
/// timestamp. Manual entries participate like any other snapshot and can
/// become the current value. Input order is irrelevant.
pub fn current_balances(snapshots: Vec<BalanceSnapshot>) -> Vec<BalanceSnapshot> {
    let deduped = dedup_snapshots(snapshots);

    let mut by_account: HashMap<AccountKey, BalanceSnapshot> = HashMap::new();
    for snapshot in deduped {
        let key = AccountKey::of(&snapshot);
        match by_account.get(&key) {
            Some(current)
                if (current.dt_geracao, current.dt_upload)
                    >= (snapshot.dt_geracao, snapshot.dt_upload) => {}
            _ => {
                by_account.insert(key, snapshot);
            }
        }
    }

    let mut out: Vec<BalanceSnapshot> = by_account.into_values().collect();
    out.sort_by(|a, b| {
        (&a.banco_codigo, &a.agencia, &a.conta).cmp(&(&b.banco_codigo, &b.agencia, &b.conta))
    });
    out
}
