//! Full pairing and visibility lifecycle against the in-memory store.

use serde_json::json;

use calple_core::connection;
use calple_core::date::Viewport;
use calple_core::dday::{self, DDay, DDayPatch, NewDDay};
use calple_core::resolver;
use calple_core::store::{DocumentStore, Fields, MemoryStore};
use calple_core::user::USERS;

const ANA: &str = "ana@example.com";
const BO: &str = "bo@example.com";

async fn seed_user(store: &MemoryStore, uid: &str, email: &str, name: &str) {
    let mut fields = Fields::new();
    fields.insert("email".into(), json!(email));
    fields.insert("name".into(), json!(name));
    store.set(USERS, uid, fields).await.unwrap();
}

async fn seed_couple(store: &MemoryStore) {
    seed_user(store, "uid-ana", ANA, "Ana").await;
    seed_user(store, "uid-bo", BO, "Bo").await;
}

fn event(title: &str, date: &str) -> NewDDay {
    NewDDay {
        title: title.to_string(),
        description: String::new(),
        group: String::new(),
        date: Some(calple_core::date::CalDate::parse(date).unwrap()),
        end_date: None,
        is_annual: false,
        connected_users: Vec::new(),
    }
}

async fn resolve(store: &dyn DocumentStore, email: &str, view: &str) -> Vec<DDay> {
    resolver::resolve_viewport(store, email, Viewport::parse(view).unwrap()).await
}

#[tokio::test]
async fn pairing_shares_existing_and_future_events() {
    let store = MemoryStore::new();
    seed_couple(&store).await;

    // Events created before pairing are private.
    let anniversary = dday::create(&store, ANA, event("Anniversary", "20250214"))
        .await
        .unwrap();
    assert!(anniversary.connected_users.is_empty());
    assert!(resolve(&store, BO, "202502").await.is_empty());

    // Invite and accept: existing events become shared both ways.
    let conn_id = connection::invite(&store, ANA, BO).await.unwrap();
    let invitations = connection::pending_invitations(&store, BO).await.unwrap();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].from_name, "Ana");

    connection::accept(&store, &conn_id, BO).await.unwrap();

    let bos_view = resolve(&store, BO, "202502").await;
    assert_eq!(bos_view.len(), 1);
    assert_eq!(bos_view[0].title, "Anniversary");

    // Events created after pairing pick the partner up automatically.
    let dinner = dday::create(&store, BO, event("Dinner", "20250220")).await.unwrap();
    assert_eq!(dinner.connected_users, vec![ANA.to_string()]);

    let anas_view = resolve(&store, ANA, "202502").await;
    assert_eq!(anas_view.len(), 2);
}

#[tokio::test]
async fn rejection_revokes_access_and_allows_a_fresh_cycle() {
    let store = MemoryStore::new();
    seed_couple(&store).await;

    let anniversary = dday::create(&store, ANA, event("Anniversary", "20250214"))
        .await
        .unwrap();

    let conn_id = connection::invite(&store, ANA, BO).await.unwrap();
    connection::accept(&store, &conn_id, BO).await.unwrap();
    assert_eq!(resolve(&store, BO, "202502").await.len(), 1);

    // Removal revokes both sides and deletes the connection.
    connection::reject(&store, &conn_id, ANA).await.unwrap();
    assert!(resolve(&store, BO, "202502").await.is_empty());
    assert!(
        connection::active_connection(&store, ANA)
            .await
            .unwrap()
            .is_none()
    );

    let doc = store
        .get(dday::DDAYS, &anniversary.id)
        .await
        .unwrap()
        .unwrap();
    assert!(doc.string_array("connectedUsers").is_empty());

    // Re-pairing behaves like a fresh cycle, no residual ACLs in the way.
    let conn_id = connection::invite(&store, BO, ANA).await.unwrap();
    connection::accept(&store, &conn_id, ANA).await.unwrap();
    assert_eq!(resolve(&store, BO, "202502").await.len(), 1);
}

#[tokio::test]
async fn shared_members_can_write_but_not_delete() {
    let store = MemoryStore::new();
    seed_couple(&store).await;

    let conn_id = connection::invite(&store, ANA, BO).await.unwrap();
    connection::accept(&store, &conn_id, BO).await.unwrap();

    let trip = dday::create(&store, ANA, event("Trip", "20250310")).await.unwrap();

    // Partner may edit the shared event.
    let patch = DDayPatch {
        description: Some("Booked the cabin".to_string()),
        ..DDayPatch::default()
    };
    let updated = dday::update(&store, BO, &trip.id, patch).await.unwrap();
    assert_eq!(updated.description, "Booked the cabin");

    // But only the owner may delete it.
    assert!(dday::delete(&store, BO, &trip.id).await.is_err());
    dday::delete(&store, ANA, &trip.id).await.unwrap();
}

#[tokio::test]
async fn viewport_resolution_handles_mixed_event_shapes() {
    let store = MemoryStore::new();
    seed_couple(&store).await;

    let conn_id = connection::invite(&store, ANA, BO).await.unwrap();
    connection::accept(&store, &conn_id, BO).await.unwrap();

    // A multi-day span crossing into March.
    let mut ski = event("Ski week", "20250226");
    ski.end_date = Some(calple_core::date::CalDate::parse("20250304").unwrap());
    dday::create(&store, ANA, ski).await.unwrap();

    // An anniversary from years back.
    let mut first_date = event("First date", "20190301");
    first_date.is_annual = true;
    dday::create(&store, BO, first_date).await.unwrap();

    // An unscheduled wish.
    let mut wish = event("Visit Jeju", "20250101");
    wish.date = None;
    dday::create(&store, ANA, wish).await.unwrap();

    // An event in a different month entirely.
    dday::create(&store, BO, event("Tax deadline", "20250415"))
        .await
        .unwrap();

    let mut titles: Vec<String> = resolve(&store, BO, "202503")
        .await
        .into_iter()
        .map(|d| d.title)
        .collect();
    titles.sort();
    assert_eq!(titles, ["First date", "Ski week", "Visit Jeju"]);

    // February sees the span's start but not the April deadline.
    let mut titles: Vec<String> = resolve(&store, ANA, "202502")
        .await
        .into_iter()
        .map(|d| d.title)
        .collect();
    titles.sort();
    assert_eq!(titles, ["Ski week", "Visit Jeju"]);
}
