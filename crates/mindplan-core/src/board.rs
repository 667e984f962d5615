//! Headless state of the todo board.
//!
//! The board has two orthogonal parts: the [`ViewMode`] used for the
//! existing todos, and an optional smart-mode session in which a goal is
//! turned into a plan, reviewed and committed. All state is owned and
//! mutated through `&mut self`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use mindplan_db::models::Todo;

use crate::client::{PlanApi, RpcError, TodoApi};
use crate::commit::{CommitError, commit_labels};
use crate::graph::{
    Graph, GraphEdge, LayoutConfig, NodeView, apply_layout, todos_to_graph, tree_to_graph,
};
use crate::mindmap::MindMapNode;
use crate::selection::{SelectionKey, SelectionState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    #[serde(rename = "mindmap")]
    MindMap,
}

/// Where a smart-mode session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartPhase {
    GoalEntry,
    PlanReview,
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("goal must not be empty")]
    EmptyGoal,

    #[error("no plan to review")]
    NoPlan,

    #[error("smart mode is not active")]
    SmartModeInactive,

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

#[derive(Debug, Clone)]
struct Plan {
    root: MindMapNode,
    selection: SelectionState,
}

#[derive(Debug, Clone, Default)]
pub struct Board {
    view_mode: ViewMode,
    smart_mode: bool,
    goal: String,
    plan: Option<Plan>,
    todos: Vec<Todo>,
    todo_graph: Graph,
    generating: bool,
    committing: bool,
    last_error: Option<String>,
    selection_key: SelectionKey,
    layout: LayoutConfig,
}

impl Board {
    pub fn new(selection_key: SelectionKey, layout: LayoutConfig) -> Self {
        Self {
            selection_key,
            layout,
            ..Self::default()
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn is_smart_mode(&self) -> bool {
        self.smart_mode
    }

    /// `None` outside smart mode.
    pub fn smart_phase(&self) -> Option<SmartPhase> {
        if !self.smart_mode {
            return None;
        }
        Some(match self.plan {
            Some(_) => SmartPhase::PlanReview,
            None => SmartPhase::GoalEntry,
        })
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn is_committing(&self) -> bool {
        self.committing
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn plan_root(&self) -> Option<&MindMapNode> {
        self.plan.as_ref().map(|p| &p.root)
    }

    pub fn selection(&self) -> Option<&SelectionState> {
        self.plan.as_ref().map(|p| &p.selection)
    }

    pub fn selected_count(&self) -> usize {
        self.selection().map_or(0, SelectionState::len)
    }

    pub fn enter_smart_mode(&mut self) {
        self.smart_mode = true;
        self.view_mode = ViewMode::List;
        self.goal.clear();
        self.plan = None;
        self.last_error = None;
        debug!("entered smart mode");
    }

    pub fn close_smart_mode(&mut self) {
        self.smart_mode = false;
        self.plan = None;
        self.last_error = None;
        debug!("closed smart mode");
    }

    /// Switch between list and mind-map views. Ignored while in smart mode,
    /// where the view is always the plan.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.smart_mode {
            return;
        }
        self.view_mode = mode;
        if mode == ViewMode::MindMap {
            self.rebuild_todo_graph();
        }
    }

    pub fn set_goal(&mut self, goal: impl Into<String>) {
        self.goal = goal.into();
    }

    /// Validate the goal and mark generation as pending. Returns the goal to
    /// send.
    pub fn begin_generation(&mut self) -> Result<String, BoardError> {
        if !self.smart_mode {
            return Err(BoardError::SmartModeInactive);
        }
        let goal = self.goal.trim();
        if goal.is_empty() {
            return Err(BoardError::EmptyGoal);
        }
        self.generating = true;
        self.last_error = None;
        Ok(goal.to_string())
    }

    /// Record a generation result. Results are stored even if smart mode was
    /// closed in the meantime; re-entering smart mode clears them.
    pub fn finish_generation(
        &mut self,
        result: Result<MindMapNode, RpcError>,
    ) -> Result<(), BoardError> {
        self.generating = false;
        match result {
            Ok(root) => {
                self.apply_plan(root);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "plan generation failed");
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Ask `api` for a plan for the current goal and move to plan review.
    pub async fn generate(&mut self, api: &dyn PlanApi) -> Result<(), BoardError> {
        let goal = self.begin_generation()?;
        let result = api.generate_plan(&goal).await;
        self.finish_generation(result)
    }

    /// Turn a tree into the reviewable graph: flatten, lay out, and select
    /// every node.
    pub fn apply_plan(&mut self, root: MindMapNode) {
        let mut graph = tree_to_graph(&root);
        apply_layout(&mut graph, &self.layout);
        info!(nodes = graph.nodes.len(), edges = graph.edges.len(), "plan ready for review");
        self.plan = Some(Plan {
            selection: SelectionState::new(graph, self.selection_key),
            root,
        });
    }

    /// Drop the plan and return to goal entry.
    pub fn reset_plan(&mut self) {
        self.plan = None;
        self.last_error = None;
    }

    pub fn toggle_node(&mut self, node_id: &str, checked: bool) -> Result<bool, BoardError> {
        let plan = self.plan.as_mut().ok_or(BoardError::NoPlan)?;
        Ok(plan.selection.toggle(node_id, checked))
    }

    pub fn set_todos(&mut self, todos: Vec<Todo>) {
        self.todos = todos;
        if self.view_mode == ViewMode::MindMap && !self.smart_mode {
            self.rebuild_todo_graph();
        }
    }

    pub async fn refresh(&mut self, api: &dyn TodoApi) -> Result<(), BoardError> {
        let todos = api.list_todos().await?;
        self.set_todos(todos);
        Ok(())
    }

    fn rebuild_todo_graph(&mut self) {
        let mut graph = todos_to_graph(&self.todos);
        apply_layout(&mut graph, &self.layout);
        self.todo_graph = graph;
    }

    /// Nodes to draw for the current state: the plan under review, the
    /// existing-todos graph, or nothing in list view.
    pub fn nodes_view(&self) -> Vec<NodeView> {
        if self.smart_mode {
            return self
                .plan
                .as_ref()
                .map(|p| p.selection.view())
                .unwrap_or_default();
        }
        match self.view_mode {
            ViewMode::List => Vec::new(),
            ViewMode::MindMap => self.todo_graph.nodes.iter().map(NodeView::read_only).collect(),
        }
    }

    pub fn edges(&self) -> &[GraphEdge] {
        if self.smart_mode {
            return match &self.plan {
                Some(plan) => &plan.selection.graph().edges,
                None => &[],
            };
        }
        match self.view_mode {
            ViewMode::List => &[],
            ViewMode::MindMap => &self.todo_graph.edges,
        }
    }

    /// Start committing the reviewed plan. Returns the labels to create, in
    /// selection order.
    pub fn begin_commit(&mut self) -> Result<Vec<String>, BoardError> {
        if !self.smart_mode {
            return Err(BoardError::SmartModeInactive);
        }
        let labels = self
            .selection()
            .ok_or(BoardError::NoPlan)?
            .selected_labels();
        self.committing = true;
        self.last_error = None;
        Ok(labels)
    }

    /// Record a commit result. Success closes the session and switches to
    /// the list view; a partial failure keeps the plan up with the created
    /// labels deselected.
    pub fn finish_commit(
        &mut self,
        result: Result<Vec<Todo>, CommitError>,
    ) -> Result<Vec<Todo>, BoardError> {
        self.committing = false;
        match result {
            Ok(created) => {
                self.goal.clear();
                self.plan = None;
                self.smart_mode = false;
                self.view_mode = ViewMode::List;
                Ok(created)
            }
            Err(e) => {
                if let Some(plan) = self.plan.as_mut() {
                    plan.selection.mark_committed(e.created.len());
                }
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Create a todo per selected label, then refetch the todo list.
    pub async fn confirm(&mut self, api: &dyn TodoApi) -> Result<Vec<Todo>, BoardError> {
        let labels = self.begin_commit()?;
        let result = commit_labels(api, &labels).await;
        let created = self.finish_commit(result)?;

        if let Err(e) = self.refresh(api).await {
            warn!(error = %e, "failed to refetch todos after commit");
            self.last_error = Some(e.to_string());
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::commit::fake::{FakeTodos, todo};

    struct FixedPlan(Mutex<Vec<String>>, MindMapNode);

    impl FixedPlan {
        fn new(root: MindMapNode) -> Self {
            Self(Mutex::new(Vec::new()), root)
        }
    }

    #[async_trait]
    impl PlanApi for FixedPlan {
        async fn generate_plan(&self, goal: &str) -> Result<MindMapNode, RpcError> {
            self.0.lock().unwrap().push(goal.to_string());
            Ok(self.1.clone())
        }
    }

    struct FailingPlan;

    #[async_trait]
    impl PlanApi for FailingPlan {
        async fn generate_plan(&self, _goal: &str) -> Result<MindMapNode, RpcError> {
            Err(RpcError::Status {
                procedure: "ai.generatePlan".to_string(),
                status: 502,
                message: "provider unavailable".to_string(),
            })
        }
    }

    fn plan() -> MindMapNode {
        MindMapNode::leaf("root", "Move house").with_children(vec![
            MindMapNode::leaf("a", "Pack boxes"),
            MindMapNode::leaf("b", "Hire van"),
        ])
    }

    fn reviewing() -> Board {
        let mut board = Board::default();
        board.enter_smart_mode();
        board.apply_plan(plan());
        board
    }

    #[test]
    fn entering_smart_mode_forces_list_and_clears_plan() {
        let mut board = Board::default();
        board.set_view_mode(ViewMode::MindMap);
        board.enter_smart_mode();
        assert_eq!(board.view_mode(), ViewMode::List);
        assert_eq!(board.smart_phase(), Some(SmartPhase::GoalEntry));

        board.set_goal("Move house");
        board.apply_plan(plan());
        assert_eq!(board.smart_phase(), Some(SmartPhase::PlanReview));

        board.enter_smart_mode();
        assert_eq!(board.smart_phase(), Some(SmartPhase::GoalEntry));
        assert_eq!(board.goal(), "");
        assert!(board.plan_root().is_none());
    }

    #[test]
    fn view_mode_is_locked_in_smart_mode() {
        let mut board = Board::default();
        board.enter_smart_mode();
        board.set_view_mode(ViewMode::MindMap);
        assert_eq!(board.view_mode(), ViewMode::List);

        board.close_smart_mode();
        assert_eq!(board.smart_phase(), None);
        board.set_view_mode(ViewMode::MindMap);
        assert_eq!(board.view_mode(), ViewMode::MindMap);
    }

    #[test]
    fn mindmap_view_of_no_todos_is_empty() {
        let mut board = Board::default();
        board.set_view_mode(ViewMode::MindMap);
        assert!(board.nodes_view().is_empty());
        assert!(board.edges().is_empty());
    }

    #[test]
    fn mindmap_view_tracks_todo_changes() {
        let mut board = Board::default();
        board.set_view_mode(ViewMode::MindMap);
        board.set_todos(vec![todo(1, "Water plants", true), todo(2, "Call mum", false)]);

        let view = board.nodes_view();
        assert_eq!(view.len(), 3);
        assert!(view.iter().all(|v| !v.interactive));
        let struck: Vec<&str> = view
            .iter()
            .filter(|v| v.struck_through)
            .map(|v| v.label.as_str())
            .collect();
        assert_eq!(struck, vec!["Water plants"]);
        assert_eq!(board.edges().len(), 2);

        board.set_todos(Vec::new());
        assert!(board.nodes_view().is_empty());
    }

    #[test]
    fn list_view_draws_no_graph() {
        let mut board = Board::default();
        board.set_todos(vec![todo(1, "a", false)]);
        assert!(board.nodes_view().is_empty());
    }

    #[tokio::test]
    async fn generate_moves_to_plan_review() {
        let api = FixedPlan::new(plan());
        let mut board = Board::default();
        board.enter_smart_mode();
        board.set_goal("  Move house ");
        board.generate(&api).await.unwrap();

        assert_eq!(*api.0.lock().unwrap(), vec!["Move house".to_string()]);
        assert!(!board.is_generating());
        assert_eq!(board.smart_phase(), Some(SmartPhase::PlanReview));
        assert_eq!(board.selected_count(), 3);
        let view = board.nodes_view();
        assert_eq!(view.len(), 3);
        assert!(view.iter().all(|v| v.interactive && v.checked));
        assert_eq!(view[0].position.y, 0.0);
        assert_eq!(view[1].position.y, 100.0);
    }

    #[tokio::test]
    async fn empty_goal_is_rejected() {
        let api = FixedPlan::new(plan());
        let mut board = Board::default();
        board.enter_smart_mode();
        board.set_goal("   ");
        assert!(matches!(board.generate(&api).await, Err(BoardError::EmptyGoal)));
        assert!(api.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_is_recorded() {
        let mut board = Board::default();
        board.enter_smart_mode();
        board.set_goal("Move house");
        let err = board.generate(&FailingPlan).await.unwrap_err();
        assert!(matches!(err, BoardError::Rpc(RpcError::Status { status: 502, .. })));
        assert!(!board.is_generating());
        assert!(board.last_error().unwrap().contains("provider unavailable"));
        assert_eq!(board.smart_phase(), Some(SmartPhase::GoalEntry));
    }

    #[test]
    fn late_result_is_kept_until_smart_mode_is_reentered() {
        let mut board = Board::default();
        board.enter_smart_mode();
        board.set_goal("Move house");
        board.begin_generation().unwrap();
        board.close_smart_mode();

        board.finish_generation(Ok(plan())).unwrap();
        assert!(board.plan_root().is_some());
        assert_eq!(board.smart_phase(), None);

        board.enter_smart_mode();
        assert!(board.plan_root().is_none());
    }

    #[test]
    fn commit_in_flight_is_visible_until_finished() {
        let mut board = reviewing();
        board.toggle_node("root", false).unwrap();

        let labels = board.begin_commit().unwrap();
        assert_eq!(labels, vec!["Pack boxes", "Hire van"]);
        assert!(board.is_committing());

        let err = board
            .finish_commit(Err(CommitError {
                created: vec![todo(1, "Pack boxes", false)],
                failed: "Hire van".to_string(),
                remaining: Vec::new(),
                source: RpcError::Status {
                    procedure: "todo.create".to_string(),
                    status: 500,
                    message: "db down".to_string(),
                },
            }))
            .unwrap_err();
        assert!(matches!(err, BoardError::Commit(_)));
        assert!(!board.is_committing());
        assert_eq!(board.smart_phase(), Some(SmartPhase::PlanReview));
        assert_eq!(board.selection().unwrap().selected_labels(), vec!["Hire van"]);

        board.begin_commit().unwrap();
        let created = board.finish_commit(Ok(vec![todo(2, "Hire van", false)])).unwrap();
        assert_eq!(created.len(), 1);
        assert!(!board.is_committing());
        assert!(!board.is_smart_mode());
    }

    #[test]
    fn reset_returns_to_goal_entry() {
        let mut board = reviewing();
        board.reset_plan();
        assert_eq!(board.smart_phase(), Some(SmartPhase::GoalEntry));
        assert!(matches!(board.toggle_node("a", false), Err(BoardError::NoPlan)));
    }

    #[tokio::test]
    async fn confirm_creates_selected_and_leaves_smart_mode() {
        let api = FakeTodos::default();
        let mut board = reviewing();
        assert!(board.toggle_node("b", false).unwrap());
        assert_eq!(board.selected_count(), 2);

        let created = board.confirm(&api).await.unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(api.created_labels(), vec!["Move house", "Pack boxes"]);
        assert!(!board.is_smart_mode());
        assert_eq!(board.view_mode(), ViewMode::List);
        assert!(board.plan_root().is_none());
        assert_eq!(board.goal(), "");
        // Refetched after commit.
        assert_eq!(board.todos().len(), 2);
    }

    #[tokio::test]
    async fn partial_confirm_keeps_plan_without_created_items() {
        let api = FakeTodos::failing_on("Hire van");
        let mut board = reviewing();

        let err = board.confirm(&api).await.unwrap_err();
        let BoardError::Commit(commit) = err else {
            panic!("expected commit error");
        };
        assert_eq!(commit.created.len(), 2);
        assert_eq!(commit.failed, "Hire van");

        assert!(board.is_smart_mode());
        assert_eq!(board.smart_phase(), Some(SmartPhase::PlanReview));
        assert!(board.last_error().is_some());
        assert_eq!(
            board.selection().unwrap().selected_labels(),
            vec!["Hire van".to_string()]
        );
    }

    #[tokio::test]
    async fn confirm_requires_a_plan() {
        let api = FakeTodos::default();
        let mut board = Board::default();
        assert!(matches!(
            board.confirm(&api).await,
            Err(BoardError::SmartModeInactive)
        ));
        board.enter_smart_mode();
        assert!(matches!(board.confirm(&api).await, Err(BoardError::NoPlan)));
    }

    #[tokio::test]
    async fn refresh_loads_todos() {
        let api = FakeTodos::with_todos(vec![todo(4, "Existing", false)]);
        let mut board = Board::default();
        board.set_view_mode(ViewMode::MindMap);
        board.refresh(&api).await.unwrap();
        assert_eq!(board.todos().len(), 1);
        assert_eq!(board.nodes_view()[1].id, "todo-4");
    }
}
