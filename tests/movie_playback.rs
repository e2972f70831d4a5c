//! End-to-end playback: JSON payload in, layer sets out.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use phylo_movie::layers::{LINKS, LINK_OUTLINES, NODES, RENDER_ORDER};
use phylo_movie::layout::SplitSet;
use phylo_movie::{
    AnimationController, FrameHandle, FrameScheduler, InlineLayoutWorker, LayerSet, LayerSink,
    LayoutTransport, LayoutWorker, MovieData, Options, RadialLayout,
};
use web_time::Instant;

const PAYLOAD: &str = r#"{
    "interpolated_trees": [
        {"children": [{"children": [{"name": "A", "length": 1}, {"name": "B", "length": 1}], "length": 0.5}, {"name": "C", "length": 1}]},
        {"children": [{"children": [{"name": "A", "length": 1}, {"name": "B", "length": 1}], "length": 0.5}, {"name": "C", "length": 1.5}]},
        {"children": [{"children": [{"name": "A", "length": 1}, {"name": "B", "length": 1}], "length": 0.5}, {"name": "C", "length": 2}]},
        {"children": [{"children": [{"name": "A", "length": 1}, {"name": "C", "length": 1}], "length": 0.5}, {"name": "B", "length": 1}]},
        {"children": [{"children": [{"name": "A", "length": 1}, {"name": "C", "length": 1}], "length": 0.5}, {"name": "B", "length": 1}]}
    ],
    "tree_metadata": [
        {"tree_name": "T0"},
        {"tree_name": "IT1"},
        {"tree_name": "T1"},
        {"tree_name": "IT_down_2", "s_edge_tracker": "(0,1)"},
        {"tree_name": "T2"}
    ],
    "sorted_leaves": ["A", "B", "C"],
    "rfd_list": [0.0, 0.5],
    "to_be_highlighted": [[], [[1]]]
}"#;

#[derive(Default)]
struct Frames {
    next: u64,
}

impl FrameScheduler for Frames {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        FrameHandle(self.next)
    }

    fn cancel_frame(&mut self, _handle: FrameHandle) {}
}

#[derive(Default)]
struct Capture {
    published: Vec<LayerSet>,
}

impl LayerSink for Capture {
    fn publish(&mut self, layers: &LayerSet, _changes: &phylo_movie::layers::LayerChanges) {
        self.published.push(layers.clone());
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn controller<T: LayoutTransport>(transport: T) -> AnimationController<T, Frames, Capture> {
    let store = MovieData::from_json(PAYLOAD).unwrap().into_store().unwrap();
    AnimationController::new(
        store,
        Options::default(),
        transport,
        Frames::default(),
        Capture::default(),
    )
}

/// Tick until a frame is published or the budget runs out.
fn tick_until_published<T: LayoutTransport>(
    c: &mut AnimationController<T, Frames, Capture>,
) -> bool {
    for _ in 0..200 {
        if c.tick(Instant::now()) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Jumping taxa of the transition shown at keyframe `p`.
fn marked_at<T: LayoutTransport>(
    c: &AnimationController<T, Frames, Capture>,
    p: usize,
) -> Vec<SplitSet> {
    let h = c.store().resolver().highlighting_index(p).unwrap();
    c.store().metadata().jumping_taxa(h).to_vec()
}

fn outline_visible(layers: &LayerSet) -> bool {
    layers.get(LINK_OUTLINES).unwrap().visible
}

#[test]
fn payload_resolves_transition_indices() {
    init_logging();
    let store = MovieData::from_json(PAYLOAD).unwrap().into_store().unwrap();
    let resolver = store.resolver();
    assert_eq!(store.num_transitions(), 2);
    assert_eq!(resolver.full_tree_indices(), &[0, 2, 4]);
    let highlight: Vec<_> = (0..5).map(|p| resolver.highlighting_index(p)).collect();
    assert_eq!(highlight, vec![Some(0), Some(0), Some(1), Some(1), Some(1)]);
    assert_eq!(resolver.distance_index(2), Some(0));
    assert_eq!(store.metadata().s_edges(1), &[SplitSet::new([0, 1])]);
}

#[test]
fn threaded_worker_drives_the_first_frame() {
    init_logging();
    let worker = LayoutWorker::new(Arc::new(RadialLayout)).unwrap();
    let mut c = controller(worker);
    assert!(tick_until_published(&mut c));
    let layers = &c.sink().published[0];
    assert_eq!(layers.ids(), RENDER_ORDER);
    assert!(layers.get(LINKS).unwrap().pickable);
    assert!(layers.get(NODES).unwrap().pickable);
    assert_eq!(layers.get(NODES).unwrap().data.len(), 5);
}

#[test]
fn outline_layer_appears_with_highlights() {
    init_logging();
    let mut c = controller(InlineLayoutWorker::new(Arc::new(RadialLayout)));
    assert!(tick_until_published(&mut c));
    assert!(!outline_visible(c.sink().published.last().unwrap()));
    assert!(!c.color_manager().has_active_change_edges());

    c.seek(2.0);
    assert!(tick_until_published(&mut c));
    assert!(outline_visible(c.sink().published.last().unwrap()));
    assert_eq!(
        c.color_manager().shared_marked_jumping_subtrees(),
        &[SplitSet::new([1])]
    );
}

#[test]
fn seeking_across_a_boundary_swaps_the_marked_subtrees() {
    init_logging();
    let mut c = controller(InlineLayoutWorker::new(Arc::new(RadialLayout)));
    assert!(tick_until_published(&mut c));
    assert!(c.color_manager().highlights().marked.is_empty());
    assert_eq!(c.color_manager().highlights().marked, marked_at(&c, 0));

    c.seek(2.0);
    assert!(tick_until_published(&mut c));
    assert_eq!(c.color_manager().highlights().marked, vec![SplitSet::new([1])]);
    assert_eq!(c.color_manager().highlights().marked, marked_at(&c, 2));

    c.seek(1.0);
    assert!(tick_until_published(&mut c));
    assert_eq!(c.color_manager().highlights().marked, marked_at(&c, 1));
    assert!(c.color_manager().highlights().marked.is_empty());
}

#[test]
fn scrubbing_restyles_from_the_visible_transition() {
    init_logging();
    let mut options = Options::default();
    options.highlight.subtree_dimming_enabled = true;
    let store = MovieData::from_json(PAYLOAD).unwrap().into_store().unwrap();
    let mut c = AnimationController::new(
        store,
        options,
        InlineLayoutWorker::new(Arc::new(RadialLayout)),
        Frames::default(),
        Capture::default(),
    );
    assert!(tick_until_published(&mut c));
    let before = c.color_version();

    c.seek(3.5);
    assert!(tick_until_published(&mut c));
    assert!(c.color_version() > before);
    assert!(c.color_manager().has_active_change_edges());
    assert_eq!(c.timeline().pair().k0, 3);
    assert!(c.last_frame().is_some());
}

#[test]
fn playback_runs_to_the_end_and_stops() {
    init_logging();
    let mut options = Options::default();
    options.playback.base_interval_ms = 0.0;
    let store = MovieData::from_json(PAYLOAD).unwrap().into_store().unwrap();
    let mut c = AnimationController::new(
        store,
        options,
        InlineLayoutWorker::new(Arc::new(RadialLayout)),
        Frames::default(),
        Capture::default(),
    );
    c.play();
    for _ in 0..50 {
        let _ = c.tick(Instant::now());
        std::thread::sleep(Duration::from_millis(1));
        if !c.is_playing() {
            break;
        }
    }
    assert!(!c.is_playing());
    assert_eq!(c.position(), 4.0);
}
