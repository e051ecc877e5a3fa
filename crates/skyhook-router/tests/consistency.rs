//! Cross-module scenarios: the registry, port pool, and slug policy as one
//! tunnel's lifetime exercises them together.

use std::sync::Arc;

use skyhook_router::{
    random_string, slug_valid, PortRegistry, RegistryError, Session, SessionKey, SessionRegistry,
    SessionStatus, TunnelKind, GENERATED_SLUG_LEN,
};

fn http_session(user: &str, slug: &str, port: u16) -> Arc<Session> {
    let session = Session::detached(user);
    session.slug().set(slug);
    session.set_kind(TunnelKind::Http);
    session.set_forwarded_port(port);
    session.set_status(SessionStatus::Running);
    session
}

#[test]
fn tcp_tunnel_lifetime_keeps_indices_consistent() {
    let registry = SessionRegistry::new();
    let ports = PortRegistry::new();
    ports.add_range(10000, 10002);

    // claim the port the way the orchestrator does, then register
    let port = ports.unassigned().unwrap();
    assert!(ports.claim(port));

    let session = Session::detached("alice");
    session.set_kind(TunnelKind::Tcp);
    session.set_forwarded_port(port);
    session.slug().set(port.to_string());
    session.set_status(SessionStatus::Running);

    let key = SessionKey::tcp(port);
    assert!(registry.register(key.clone(), &session));

    // a running TCP session's port reads as assigned
    assert!(!ports.claim(port));

    // lookup key round-trips through the session's own view of its key
    let found = registry.get(&key).unwrap();
    assert_eq!(found.registry_key().unwrap(), key);
    assert_eq!(found.slug().get(), port.to_string());

    // teardown: remove then release, as lifecycle close does
    registry.remove(&key);
    ports.set_status(port, false).unwrap();

    assert!(registry.get(&key).is_none());
    assert!(registry.all_for_user("alice").is_empty());
    assert_eq!(ports.unassigned(), Some(port));
}

#[test]
fn rename_moves_every_index_and_the_slug_holder() {
    let registry = SessionRegistry::new();
    let slug = random_string(GENERATED_SLUG_LEN).unwrap();
    let session = http_session("owner", &slug, 80);

    let old = SessionKey::http(slug.clone());
    assert!(registry.register(old.clone(), &session));

    registry
        .update("owner", &old, SessionKey::http("my-app"))
        .unwrap();

    // old key gone, new key resolves, inverse index reflects only the new key
    assert!(registry.get(&old).is_none());
    let found = registry.get(&SessionKey::http("my-app")).unwrap();
    assert_eq!(found.user(), "owner");
    assert_eq!(found.slug().get(), "my-app");
    assert_eq!(
        registry.keys_for_user("owner"),
        vec![SessionKey::http("my-app")]
    );

    // and the session's derived key now matches its registration
    assert_eq!(
        found.registry_key().unwrap(),
        SessionKey::http("my-app")
    );
}

#[test]
fn reserved_rename_leaves_everything_untouched() {
    let registry = SessionRegistry::new();
    let session = http_session("owner", "s0slug", 443);
    let old = SessionKey::http("s0slug");
    registry.register(old.clone(), &session);

    let err = registry
        .update("owner", &old, SessionKey::http("admin"))
        .unwrap_err();
    assert_eq!(err, RegistryError::Reserved("admin".into()));

    assert!(registry.get(&SessionKey::http("admin")).is_none());
    assert_eq!(registry.get(&old).unwrap().slug().get(), "s0slug");
}

#[test]
fn generated_slugs_always_pass_the_rename_rules() {
    for _ in 0..64 {
        let slug = random_string(GENERATED_SLUG_LEN).unwrap();
        assert!(slug_valid(&slug), "generated slug rejected: {slug}");
    }
}
