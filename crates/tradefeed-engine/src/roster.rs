//! Default trader roster

use tracing::info;

use tradefeed_store::{StoreResult, TraderStore};
use tradefeed_types::{TraderId, TraderSnapshot};

/// (display name, country) pairs used to populate an empty store
pub const DEFAULT_ROSTER: &[(&str, &str)] = &[
    ("Alex M.", "US"),
    ("Sofia R.", "ES"),
    ("Kenji T.", "JP"),
    ("Amara O.", "NG"),
    ("Lukas B.", "DE"),
    ("Priya S.", "IN"),
    ("Mateo G.", "AR"),
    ("Chloe D.", "FR"),
    ("Noah W.", "GB"),
    ("Yuna K.", "KR"),
    ("Omar H.", "AE"),
    ("Elena P.", "IT"),
    ("Lucas F.", "BR"),
    ("Mia J.", "AU"),
    ("Ivan V.", "UA"),
    ("Sara L.", "SE"),
    ("Daniel C.", "CA"),
    ("Aylin Y.", "TR"),
    ("Tom N.", "NL"),
    ("Lea Z.", "CH"),
    ("Hugo A.", "PT"),
    ("Nina Q.", "PL"),
    ("Ravi K.", "SG"),
    ("Zoe E.", "NZ"),
    ("Marco T.", "MX"),
];

/// Insert `roster` when the store holds no traders yet; returns how many
/// traders were added
pub async fn seed_roster<S>(store: &S, roster: &[(&str, &str)]) -> StoreResult<usize>
where
    S: TraderStore + ?Sized,
{
    if !store.list_all().await?.is_empty() {
        return Ok(0);
    }
    for (name, country) in roster {
        store
            .upsert_trader(&TraderSnapshot::new(TraderId::new(), *name, *country))
            .await?;
    }
    info!(traders = roster.len(), "Seeded trader roster");
    Ok(roster.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradefeed_store::InMemoryStore;

    #[tokio::test]
    async fn test_seeds_only_empty_store() {
        let store = InMemoryStore::new();
        assert_eq!(seed_roster(&store, DEFAULT_ROSTER).await.unwrap(), DEFAULT_ROSTER.len());
        assert_eq!(seed_roster(&store, DEFAULT_ROSTER).await.unwrap(), 0);
        assert_eq!(store.list_all().await.unwrap().len(), DEFAULT_ROSTER.len());
    }
}
