use super::*;
use crate::frame::{CursorMove, DrawSegment, StrokeStyle};
use crate::state::test_helpers::{assert_no_outbound, recv_outbound};
use crate::state::{CursorState, Segment, Stroke};
use tokio::time::{Duration, timeout};
use uuid::Uuid;

struct Client {
    id: Uuid,
    rx: mpsc::Receiver<Outbound>,
}

fn connect(coordinator: &mut Coordinator) -> Client {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(64);
    coordinator.connect(id, tx);
    Client { id, rx }
}

async fn drain(client: &mut Client) {
    let wait = Duration::from_millis(20);
    while let Ok(Some(_)) = timeout(wait, client.rx.recv()).await {}
}

fn draw(n: f64) -> DrawSegment {
    DrawSegment {
        x0: n,
        y0: n,
        x1: n + 1.0,
        y1: n + 2.0,
        color: "red".into(),
        line_width: 5.0,
    }
}

fn start(color: &str, line_width: f64) -> Inbound {
    Inbound::StartStroke(StrokeStyle {
        color: color.into(),
        line_width,
    })
}

fn draw_stroke(c: &mut Coordinator, id: Uuid, color: &str, segments: u32) {
    c.dispatch(id, start(color, 5.0));
    for i in 0..segments {
        c.dispatch(id, Inbound::Drawing(draw(f64::from(i))));
    }
    c.dispatch(id, Inbound::StopDrawing);
}

fn colors(strokes: &[Stroke]) -> Vec<&str> {
    strokes.iter().map(|s| s.color.as_str()).collect()
}

// =============================================================================
// EVENT TABLE
// =============================================================================

#[tokio::test]
async fn register_broadcasts_user_list_then_replies_with_history() {
    let mut c = Coordinator::new(10);
    let mut a = connect(&mut c);
    let mut b = connect(&mut c);
    c.dispatch(a.id, Inbound::RegisterUser("ada".into()));
    draw_stroke(&mut c, a.id, "red", 1);
    drain(&mut a).await;
    drain(&mut b).await;

    c.dispatch(b.id, Inbound::RegisterUser("bob".into()));

    let Outbound::UpdateUserList(users) = recv_outbound(&mut b.rx).await else {
        panic!("expected user list first");
    };
    let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["ada", "bob"]);
    assert_eq!(users[1].id, b.id);

    let Outbound::InitialHistory(history) = recv_outbound(&mut b.rx).await else {
        panic!("expected history reply");
    };
    assert_eq!(colors(&history), vec!["red"]);

    let Outbound::UpdateUserList(users) = recv_outbound(&mut a.rx).await else {
        panic!("expected user list for ada");
    };
    assert_eq!(users.len(), 2);
    assert_no_outbound(&mut a.rx).await;
}

#[tokio::test]
async fn request_history_replies_to_caller_without_side_effects() {
    let mut c = Coordinator::new(10);
    let mut a = connect(&mut c);
    let mut b = connect(&mut c);
    c.dispatch(a.id, Inbound::RegisterUser("ada".into()));
    draw_stroke(&mut c, a.id, "red", 2);
    drain(&mut a).await;
    drain(&mut b).await;

    let before = c.history().snapshot();
    c.dispatch(b.id, Inbound::RequestHistory);
    c.dispatch(b.id, Inbound::RequestHistory);

    let reply = Outbound::InitialHistory(before.clone());
    assert_eq!(recv_outbound(&mut b.rx).await, reply);
    assert_eq!(recv_outbound(&mut b.rx).await, reply);
    assert_eq!(c.history().snapshot(), before);
    assert_no_outbound(&mut a.rx).await;
}

#[tokio::test]
async fn segments_and_stop_are_relayed_to_peers_only() {
    let mut c = Coordinator::new(10);
    let mut a = connect(&mut c);
    let mut b = connect(&mut c);
    c.dispatch(a.id, Inbound::RegisterUser("ada".into()));
    drain(&mut a).await;
    drain(&mut b).await;

    c.dispatch(a.id, start("red", 5.0));
    c.dispatch(a.id, Inbound::Drawing(draw(0.0)));
    c.dispatch(a.id, Inbound::Drawing(draw(1.0)));
    c.dispatch(a.id, Inbound::StopDrawing);

    for n in [0.0, 1.0] {
        let relay = recv_outbound(&mut b.rx).await;
        assert_eq!(relay, Outbound::Drawing(draw(n)));
    }
    assert_eq!(recv_outbound(&mut b.rx).await, Outbound::StopDrawing);
    assert_no_outbound(&mut a.rx).await;
}

#[tokio::test]
async fn committed_stroke_has_one_point_per_segment_in_order() {
    let mut c = Coordinator::new(10);
    let a = connect(&mut c);
    c.dispatch(a.id, Inbound::RegisterUser("ada".into()));

    draw_stroke(&mut c, a.id, "red", 25);

    let history = c.history().snapshot();
    assert_eq!(history.len(), 1);
    let expected: Vec<Segment> = (0..25u32).map(|i| draw(f64::from(i)).segment()).collect();
    assert_eq!(history[0].points, expected);
}

#[test]
fn stop_without_segments_commits_nothing() {
    let mut c = Coordinator::new(10);
    let id = Uuid::new_v4();
    c.handle(id, Inbound::RegisterUser("ada".into()));

    c.handle(id, start("red", 5.0));
    let outcomes = c.handle(id, Inbound::StopDrawing);

    assert!(c.history().is_empty());
    let relay = Outcome::BroadcastExcludeSender(Outbound::StopDrawing);
    assert_eq!(outcomes, vec![relay]);
}

#[test]
fn unregistered_connection_cannot_start_or_move_cursor() {
    let mut c = Coordinator::new(10);
    let id = Uuid::new_v4();

    assert!(c.handle(id, start("red", 5.0)).is_empty());
    // Segment relay still happens; nothing is assembled.
    assert_eq!(c.handle(id, Inbound::Drawing(draw(0.0))).len(), 1);
    c.handle(id, Inbound::StopDrawing);
    assert!(c.history().is_empty());

    let cursor = CursorMove {
        x: 1.0,
        y: 1.0,
        state: CursorState::Moving,
    };
    assert!(c.handle(id, Inbound::CursorMove(cursor)).is_empty());
}

#[test]
fn unregistered_start_does_not_clear_redo() {
    let mut c = Coordinator::new(10);
    let a = Uuid::new_v4();
    c.handle(a, Inbound::RegisterUser("ada".into()));
    for i in 0..2 {
        c.handle(a, start("red", 5.0));
        c.handle(a, Inbound::Drawing(draw(f64::from(i))));
        c.handle(a, Inbound::StopDrawing);
    }
    c.handle(a, Inbound::Undo);

    c.handle(Uuid::new_v4(), start("blue", 1.0));
    assert_eq!(c.history().redo_len(), 1);
}

#[tokio::test]
async fn cursor_relay_carries_identity() {
    let mut c = Coordinator::new(10);
    let mut a = connect(&mut c);
    let mut b = connect(&mut c);
    c.dispatch(a.id, Inbound::RegisterUser("ada".into()));
    drain(&mut a).await;
    drain(&mut b).await;

    let cursor = CursorMove {
        x: 4.0,
        y: 8.0,
        state: CursorState::Drawing,
    };
    c.dispatch(a.id, Inbound::CursorMove(cursor));

    let Outbound::RemoteCursor(relay) = recv_outbound(&mut b.rx).await else {
        panic!("expected remote cursor");
    };
    let session = c.presence().get(a.id).expect("ada is registered");
    assert_eq!(relay.id, a.id);
    assert_eq!(relay.username, "ada");
    assert_eq!(relay.color, session.display_color);
    assert_eq!(relay.state, CursorState::Drawing);
    assert!((relay.x - 4.0).abs() < f64::EPSILON);
    assert_no_outbound(&mut a.rx).await;
}

#[test]
fn strokes_commit_in_stop_order_not_start_order() {
    let mut c = Coordinator::new(10);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    c.handle(a, Inbound::RegisterUser("ada".into()));
    c.handle(b, Inbound::RegisterUser("bob".into()));

    c.handle(a, start("red", 5.0));
    c.handle(b, start("blue", 5.0));
    c.handle(a, Inbound::Drawing(draw(0.0)));
    c.handle(b, Inbound::Drawing(draw(1.0)));
    c.handle(b, Inbound::StopDrawing);
    c.handle(a, Inbound::StopDrawing);

    assert_eq!(colors(&c.history().snapshot()), vec!["blue", "red"]);
}

#[test]
fn undo_on_empty_history_produces_no_broadcast() {
    let mut c = Coordinator::new(10);
    let id = Uuid::new_v4();
    assert!(c.handle(id, Inbound::Undo).is_empty());
    assert!(c.handle(id, Inbound::Redo).is_empty());
    assert!(c.history().is_empty());
    assert_eq!(c.history().redo_len(), 0);
}

#[test]
fn new_stroke_after_undo_clears_redo() {
    let mut c = Coordinator::new(10);
    let a = Uuid::new_v4();
    c.handle(a, Inbound::RegisterUser("ada".into()));
    c.handle(a, start("red", 5.0));
    c.handle(a, Inbound::Drawing(draw(0.0)));
    c.handle(a, Inbound::StopDrawing);
    c.handle(a, Inbound::Undo);
    assert_eq!(c.history().redo_len(), 1);

    c.handle(a, start("blue", 5.0));
    // Starting the gesture forecloses redo, before anything is committed.
    assert_eq!(c.history().redo_len(), 0);
    c.handle(a, Inbound::Drawing(draw(1.0)));
    c.handle(a, Inbound::StopDrawing);

    assert!(c.handle(a, Inbound::Redo).is_empty());
    assert_eq!(colors(&c.history().snapshot()), vec!["blue"]);
}

#[test]
fn commit_after_another_users_undo_forecloses_redo() {
    let mut c = Coordinator::new(10);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    c.handle(a, Inbound::RegisterUser("ada".into()));
    c.handle(b, Inbound::RegisterUser("bob".into()));

    c.handle(b, start("old", 5.0));
    c.handle(b, Inbound::Drawing(draw(0.0)));
    c.handle(b, Inbound::StopDrawing);

    // Ada starts before Bob's undo, so her start cannot clear it.
    c.handle(a, start("new", 5.0));
    c.handle(b, Inbound::Undo);
    assert_eq!(c.history().redo_len(), 1);

    c.handle(a, Inbound::Drawing(draw(1.0)));
    c.handle(a, Inbound::StopDrawing);
    assert_eq!(c.history().redo_len(), 0);

    assert!(c.handle(b, Inbound::Redo).is_empty());
    assert_eq!(colors(&c.history().snapshot()), vec!["new"]);
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[tokio::test]
async fn draw_undo_redo_scenario() {
    let mut c = Coordinator::new(10);
    let mut a = connect(&mut c);
    let mut b = connect(&mut c);
    c.dispatch(a.id, Inbound::RegisterUser("ada".into()));
    c.dispatch(b.id, Inbound::RegisterUser("bob".into()));

    c.dispatch(a.id, start("red", 5.0));
    for i in 0..3 {
        c.dispatch(a.id, Inbound::Drawing(draw(f64::from(i))));
    }
    c.dispatch(a.id, Inbound::StopDrawing);

    let expected = Stroke {
        color: "red".into(),
        line_width: 5.0,
        points: (0..3).map(|i| draw(f64::from(i)).segment()).collect(),
    };
    assert_eq!(c.history().snapshot(), vec![expected.clone()]);
    drain(&mut a).await;
    drain(&mut b).await;

    c.dispatch(b.id, Inbound::Undo);
    let cleared = Outbound::RedrawAll(Vec::new());
    assert_eq!(recv_outbound(&mut a.rx).await, cleared);
    assert_eq!(recv_outbound(&mut b.rx).await, cleared);
    let undone: Vec<Stroke> = c.history().redo_stack().cloned().collect();
    assert_eq!(undone, vec![expected.clone()]);

    c.dispatch(b.id, Inbound::Redo);
    let restored = Outbound::RedrawAll(vec![expected]);
    assert_eq!(recv_outbound(&mut a.rx).await, restored);
    assert_eq!(recv_outbound(&mut b.rx).await, restored);
    assert_eq!(c.history().redo_len(), 0);
}

#[tokio::test]
async fn disconnect_mid_stroke_discards_stroke_and_updates_presence() {
    let mut c = Coordinator::new(10);
    let a = connect(&mut c);
    let mut b = connect(&mut c);
    c.dispatch(a.id, Inbound::RegisterUser("ada".into()));
    c.dispatch(b.id, Inbound::RegisterUser("bob".into()));

    c.dispatch(a.id, start("red", 5.0));
    c.dispatch(a.id, Inbound::Drawing(draw(0.0)));
    c.dispatch(a.id, Inbound::Drawing(draw(1.0)));
    drain(&mut b).await;

    c.disconnect(a.id);

    assert!(c.history().is_empty());
    let Outbound::UpdateUserList(users) = recv_outbound(&mut b.rx).await else {
        panic!("expected user list");
    };
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, b.id);
    let gone = Outbound::UserDisconnected { id: a.id };
    assert_eq!(recv_outbound(&mut b.rx).await, gone);
    assert!(!c.presence().is_registered(a.id));
}

#[tokio::test]
async fn disconnect_of_unregistered_connection_still_notifies() {
    let mut c = Coordinator::new(10);
    let a = connect(&mut c);
    let mut b = connect(&mut c);

    c.disconnect(a.id);

    let users = Outbound::UpdateUserList(Vec::new());
    let gone = Outbound::UserDisconnected { id: a.id };
    assert_eq!(recv_outbound(&mut b.rx).await, users);
    assert_eq!(recv_outbound(&mut b.rx).await, gone);
}

#[test]
fn outcome_maps_to_delivery_mode() {
    let sender = Uuid::new_v4();
    let reply = Outcome::Reply(Outbound::StopDrawing);
    let all = Outcome::Broadcast(Outbound::StopDrawing);
    let others = Outcome::BroadcastExcludeSender(Outbound::StopDrawing);
    assert_eq!(reply.delivery(sender), Delivery::To(sender));
    assert_eq!(all.delivery(sender), Delivery::All);
    assert_eq!(others.delivery(sender), Delivery::ExcludeSender(sender));
}
