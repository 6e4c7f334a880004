//! State behind the 3D forest page.
//!
//! Owns the fetched trees, the load state, the focused tree and the
//! camera-moving flag, and wires the API client, search box and camera
//! controller together. All methods run on the UI thread; the surface calls
//! `tick` once per display refresh.

use std::time::Instant;

use crate::api_client::ForestClient;
use crate::camera::{CameraController, CameraEvent, Pose, ZoomBounds};
use crate::error::ApiError;
use crate::models::{SearchHit, SearchResultSet, Tree};
use crate::search::{focus_target, SearchInteraction, SearchRequest};

/// Banner text shown when the tree list cannot be loaded
pub const LOAD_ERROR: &str = "Failed to load trees from the forest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug)]
pub struct ForestView {
    client: ForestClient,
    trees: Vec<Tree>,
    load: LoadState,
    focused: Option<Tree>,
    camera_moving: bool,
    camera: CameraController,
    search: SearchInteraction,
}

impl ForestView {
    pub fn new(client: ForestClient) -> Self {
        Self {
            client,
            trees: Vec::new(),
            load: LoadState::Loading,
            focused: None,
            camera_moving: false,
            camera: CameraController::new(),
            search: SearchInteraction::new(),
        }
    }

    pub fn with_camera(mut self, camera: CameraController) -> Self {
        self.camera = camera;
        self
    }

    /// First load when the page opens
    pub async fn mount(&mut self) {
        self.refresh().await;
    }

    /// Fetch and apply in one step. Holds the view for the whole round trip;
    /// surfaces that keep ticking during the fetch use `begin_refresh`.
    pub async fn refresh(&mut self) {
        let client = self.begin_refresh();
        let outcome = client.list_trees().await;
        self.apply_trees(outcome);
    }

    /// Enter `Loading` and hand back a client for the fetch. The view stays
    /// usable until the outcome is passed to `apply_trees`.
    pub fn begin_refresh(&mut self) -> ForestClient {
        self.load = LoadState::Loading;
        self.client.clone()
    }

    pub fn apply_trees(&mut self, outcome: Result<Vec<Tree>, ApiError>) {
        match outcome {
            Ok(trees) => {
                log::info!("[Forest] Loaded {} trees", trees.len());
                self.trees = trees;
                self.load = LoadState::Ready;
            }
            Err(e) => {
                log::error!("[Forest] Error fetching trees: {}", e);
                self.trees = Vec::new();
                self.load = LoadState::Failed(LOAD_ERROR.to_string());
            }
        }
    }

    /// Pointer entered a tree
    pub fn hover(&mut self, tree: &Tree, now: Instant) {
        if self.focused.as_ref().is_some_and(|f| f.id == tree.id) {
            return;
        }
        self.focused = Some(tree.clone());
        self.camera_moving = true;
        self.camera.focus_tree(tree, now);
    }

    /// Pointer left the focused tree
    pub fn hover_end(&mut self, now: Instant) {
        if self.focused.is_none() {
            return;
        }
        self.clear_focus(now);
    }

    /// Close button on the info panel: back to the overview
    pub fn clear_focus(&mut self, now: Instant) {
        self.focused = None;
        self.camera_moving = true;
        self.camera.focus_overview(now);
    }

    pub fn tick(&mut self, now: Instant) -> Option<CameraEvent> {
        let event = self.camera.tick(now);
        if let Some(CameraEvent::TargetReached(_)) = event {
            self.camera_moving = false;
        }
        event
    }

    pub async fn search_changed(&mut self, query: &str) {
        if let Some(request) = self.begin_search(query) {
            let outcome = self.client.search(&request.query).await;
            self.apply_search(&request, outcome);
        }
    }

    /// Record query text; returns the request to send, if any
    pub fn begin_search(&mut self, query: &str) -> Option<SearchRequest> {
        self.search.set_query(query)
    }

    /// Returns false if a newer query superseded `request`
    pub fn apply_search(&mut self, request: &SearchRequest, outcome: Result<SearchResultSet, ApiError>) -> bool {
        self.search.apply(request, outcome)
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    /// Returns true if the hit moved the camera
    pub fn select_search_hit(&mut self, hit: &SearchHit, now: Instant) -> bool {
        match focus_target(hit) {
            Some(tree) => {
                let tree = tree.clone();
                self.hover(&tree, now);
                true
            }
            None => false,
        }
    }

    /// A tree planted from this client joins the collection
    pub fn add_planted(&mut self, tree: Tree) {
        log::info!("[Forest] New tree planted: {} by {}", tree.name, tree.planter_name);
        self.trees.push(tree);
    }

    /// Page is going away; no further tick may move the camera
    pub fn teardown(&mut self) {
        self.camera.teardown();
        self.camera_moving = false;
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn is_loading(&self) -> bool {
        self.load == LoadState::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.load {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn focused_tree(&self) -> Option<&Tree> {
        self.focused.as_ref()
    }

    pub fn is_camera_moving(&self) -> bool {
        self.camera_moving
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn camera_pose(&self) -> Pose {
        self.camera.pose()
    }

    pub fn zoom_bounds(&self) -> ZoomBounds {
        self.camera.zoom_bounds()
    }

    pub fn zoom(&mut self, factor: f32) {
        self.camera.zoom(factor);
    }

    pub fn search(&self) -> &SearchInteraction {
        &self.search
    }

    pub fn client(&self) -> &ForestClient {
        &self.client
    }
}
