/// Lightweight harness for multi-user integration tests
///
/// One [`TestNetwork`] owns an in-memory ledger and storage; every
/// [`TestUser`] gets its own identity and a client wired to both, so
/// invites, key wrapping and reactions across users run entirely in-process.
///
/// # Example
///
/// ```rust,ignore
/// use permavault::testkit::TestNetwork;
///
/// #[tokio::test]
/// async fn test_share_vault() -> anyhow::Result<()> {
///     let mut net = TestNetwork::new();
///     let alice = net.add_user("alice@example.com")?;
///     let bob = net.add_user("bob@example.com")?;
///
///     let vault = alice.client().vault().create("shared", Default::default()).await?;
///     alice.client().membership().invite(vault.vault_id, bob.email(), Role::Viewer, None).await?;
///     Ok(())
/// }
/// ```
mod network;
mod user;

pub use network::TestNetwork;
pub use user::TestUser;
