//! Department status board

use std::collections::BTreeSet;

use shared::models::StatusBoardRow;
use tokio::sync::watch;

use super::ViewContext;
use crate::access::Route;
use crate::api::endpoints;
use crate::poller::{FetchState, PollSpec, RemoteCollection, SuccessRule, Subscription};
use crate::session::Session;
use crate::table::{BoardSortKey, DepartmentVisibility, SortDirection, SortState, TableQuery, derive_rows};
use crate::time_format::FormattedTime;
use crate::{ClientError, ClientResult};

const FETCH_FAILED: &str = "Failed to fetch users";

/// One rendered board row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRowView {
    pub row: StatusBoardRow,
    pub updated: FormattedTime,
}

/// Who is in which status, for the session's department
pub struct DashboardView {
    ctx: ViewContext,
    session: Session,
    board: RemoteCollection<Vec<StatusBoardRow>>,
    query: TableQuery<BoardSortKey>,
    visibility: DepartmentVisibility,
}

impl DashboardView {
    /// Check access and start polling the board
    pub fn open(ctx: ViewContext) -> ClientResult<Self> {
        let session = ctx.gate(&Route::Dashboard)?;
        let department = session
            .department()
            .ok_or_else(|| ClientError::Forbidden("No department assigned".into()))?
            .to_string();

        let board = ctx.poll(
            PollSpec::new(
                endpoints::department_statuses(&department),
                ctx.config.dashboard_poll,
                FETCH_FAILED,
            )
            .with_rule(SuccessRule::Truthy),
        );
        let visibility = ctx.visibility(&session);
        tracing::info!(department = %department, "Dashboard opened");

        Ok(Self {
            ctx,
            session,
            board,
            query: TableQuery::new(SortState::new(BoardSortKey::UpdatedAt, SortDirection::Descending)),
            visibility,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> FetchState<Vec<StatusBoardRow>> {
        self.board.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<Vec<StatusBoardRow>>> {
        self.board.subscribe()
    }

    pub fn query(&self) -> &TableQuery<BoardSortKey> {
        &self.query
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.query.search = search.into();
    }

    pub fn click_sort(&mut self, key: BoardSortKey) {
        self.query.sort.click(key);
    }

    pub fn filter_department(&mut self, department: Option<String>) {
        self.query.department = department;
    }

    pub fn filter_status(&mut self, status: Option<String>) {
        self.query.status = status;
    }

    /// Visible rows in display order
    pub fn rows(&self) -> Vec<StatusBoardRow> {
        let state = self.board.snapshot();
        let data = state.data.unwrap_or_default();
        derive_rows(&data, &self.query, &self.visibility, &self.ctx.formatter())
    }

    /// Visible rows with their update time rendered against the clock
    pub fn rendered_rows(&self) -> Vec<BoardRowView> {
        let formatter = self.ctx.formatter();
        let now = self.ctx.now();
        self.rows()
            .into_iter()
            .map(|row| {
                let updated = formatter.format(Some(&row.updated_at), now);
                BoardRowView { row, updated }
            })
            .collect()
    }

    /// Distinct status names among visible departments, for the status filter
    pub fn status_names(&self) -> Vec<String> {
        let state = self.board.snapshot();
        state
            .data
            .unwrap_or_default()
            .into_iter()
            .filter(|r| self.visibility.allows(&r.department_name))
            .map(|r| r.status_name)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn refresh(&self) {
        self.board.refresh();
    }

    pub fn close(&self) {
        self.board.stop();
    }
}
