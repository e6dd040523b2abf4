//! State and transitions of the tab bar screen hosting the account and cache flows.
//!
//! The reducer applies one [`Action`] to [`State`] and returns the [`Effect`]s that
//! must run afterwards. Running effects and feeding their results back is the
//! job of [`store::Store`].

pub mod store;

use std::sync::Arc;

use crate::{
    network::{
        service::RequestResult,
        types::{RequestError, StatusCode},
    },
    storage::{ACCESS_TOKEN, CacheStore, CredentialStore, REFRESH_TOKEN, SessionFlags},
};

pub use store::{Store, StoreHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabBarItem {
    Main,
    Map,
    Profile,
    Additionaly,
}

impl TabBarItem {
    pub fn image(&self) -> &'static str {
        match self {
            TabBarItem::Main => "main",
            TabBarItem::Map => "map",
            TabBarItem::Profile => "profile",
            TabBarItem::Additionaly => "additionally",
        }
    }

    /// The extra tab opens a modal instead of becoming the selected tab.
    pub fn is_active(&self) -> bool {
        !matches!(self, TabBarItem::Additionaly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentType {
    #[default]
    ConfidentialPolitic,
    UserAgreement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub selected_tab: TabBarItem,
    pub tab_bar_is_hidden: bool,
    pub is_loading: bool,

    pub is_show_additional_modal: bool,
    pub is_show_delete_profile_modal: bool,
    pub is_show_cache_delete_modal: bool,
    pub is_show_successfully_delete_cache_modal: bool,
    pub is_show_error_modal: bool,
    pub is_show_document_view: bool,

    pub document_type: DocumentType,
    pub is_successfully_deleted_cache: bool,
    pub size_all_files: String,
    pub error_message: Option<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            selected_tab: TabBarItem::Main,
            tab_bar_is_hidden: false,
            is_loading: false,
            is_show_additional_modal: false,
            is_show_delete_profile_modal: false,
            is_show_cache_delete_modal: false,
            is_show_successfully_delete_cache_modal: false,
            is_show_error_modal: false,
            is_show_document_view: false,
            document_type: DocumentType::default(),
            is_successfully_deleted_cache: false,
            size_all_files: String::new(),
            error_message: None,
        }
    }
}

impl State {
    pub fn any_modal_open(&self) -> bool {
        self.is_show_additional_modal
            || self.is_show_delete_profile_modal
            || self.is_show_cache_delete_modal
            || self.is_show_successfully_delete_cache_modal
            || self.is_show_error_modal
            || self.is_show_document_view
    }
}

/// The nested flows living inside the tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildFlow {
    Home,
    Map,
    Profile,
}

/// Events bubbling up from a nested flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildEvent {
    ShowTabBar,
    HideTabBar,
    OrderExcursionTapped,
    ShowWarningModal,
}

/// Notifications sent down into a nested flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildCommand {
    Appeared,
    ErrorHandling,
}

/// How the remote account deletion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The server answered but not with a 2xx status wrapper.
    Rejected { status_code: Option<u16> },
    Failed(RequestError),
}

impl DeleteOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            DeleteOutcome::Deleted => "",
            DeleteOutcome::Rejected { .. } => RequestError::UnexpectedStatusCode.custom_message(),
            DeleteOutcome::Failed(e) => e.custom_message(),
        }
    }
}

impl From<RequestResult<StatusCode>> for DeleteOutcome {
    fn from(result: RequestResult<StatusCode>) -> Self {
        match result {
            Ok(Some(status)) if status.is_success() => DeleteOutcome::Deleted,
            Ok(status) => DeleteOutcome::Rejected {
                status_code: status.map(|s| s.status_code),
            },
            Err(e) => DeleteOutcome::Failed(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Child(ChildFlow, ChildEvent),
    TabSelected(TabBarItem),

    ShowTabBar,
    HideTabBar,
    AdditionalyTapped,

    ShowDeleteModal,
    ShowCacheDeleteModal,
    ShowSuccessfullyDeleteCacheModal,
    ShowDocumentView,
    /// Open the delete confirmation again, whatever its current state.
    PresentDeleteModal,

    DeleteProfileTapped,

    CancelDeleteProfileTapped,
    CancelCacheDeleteTapped,
    CancelSuccessfullyDeleteTapped,

    CloseAllModals,
    DeleteUser,
    DeleteUserResponse(DeleteOutcome),
    DeleteCache,

    UpdateDocumentType(DocumentType),

    ShowErrorModal,
    /// Open the error modal, whatever its current state.
    PresentErrorModal,
    ErrorHandling,
}

/// Work requested by a transition, run by the store after the state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Feed a follow-up action back in, after the current one.
    Send(Action),
    /// Delete the account remotely and answer with [`Action::DeleteUserResponse`].
    DeleteAccount,
    Notify(ChildFlow, ChildCommand),
}

pub struct Reducer<TSession, TCache> {
    session: Arc<TSession>,
    cache: TCache,
}

impl<TSession, TCache> Reducer<TSession, TCache>
where
    TSession: CredentialStore + SessionFlags,
    TCache: CacheStore,
{
    pub fn new(session: Arc<TSession>, cache: TCache) -> Self {
        Self { session, cache }
    }

    pub fn reduce(&self, state: &mut State, action: Action) -> Vec<Effect> {
        match action {
            Action::TabSelected(tab) => {
                state.selected_tab = tab;
                if tab == TabBarItem::Map {
                    return vec![Effect::Notify(ChildFlow::Map, ChildCommand::Appeared)];
                }
            }
            Action::ShowTabBar => state.tab_bar_is_hidden = false,
            Action::HideTabBar => state.tab_bar_is_hidden = true,
            Action::Child(_, ChildEvent::HideTabBar) => {
                return vec![Effect::Send(Action::HideTabBar)];
            }
            Action::Child(_, ChildEvent::ShowTabBar) => {
                return vec![Effect::Send(Action::ShowTabBar)];
            }
            Action::Child(_, ChildEvent::OrderExcursionTapped | ChildEvent::ShowWarningModal) => {
                return vec![Effect::Send(Action::ShowErrorModal)];
            }
            Action::AdditionalyTapped => {
                state.is_show_additional_modal = !state.is_show_additional_modal;
                state.size_all_files = self.cache.size_all_files();
            }
            Action::ShowDeleteModal => {
                state.is_show_delete_profile_modal = !state.is_show_delete_profile_modal;
                state.is_show_additional_modal = false;
            }
            Action::PresentDeleteModal => {
                state.is_show_delete_profile_modal = true;
                state.is_show_additional_modal = false;
            }
            Action::ShowCacheDeleteModal => {
                state.is_show_cache_delete_modal = !state.is_show_cache_delete_modal;
                state.is_show_additional_modal = false;
            }
            Action::ShowSuccessfullyDeleteCacheModal => {
                state.is_show_successfully_delete_cache_modal =
                    !state.is_show_successfully_delete_cache_modal;
                state.is_show_additional_modal = false;
            }
            Action::ShowDocumentView => {
                state.is_show_document_view = !state.is_show_document_view;
            }
            Action::DeleteProfileTapped => state.is_show_additional_modal = false,
            Action::CancelDeleteProfileTapped => {
                state.is_show_additional_modal = true;
                state.is_show_delete_profile_modal = false;
            }
            Action::CancelCacheDeleteTapped => {
                state.is_show_additional_modal = true;
                state.is_show_cache_delete_modal = false;
            }
            Action::CancelSuccessfullyDeleteTapped => {
                state.is_show_successfully_delete_cache_modal = false;
            }
            Action::CloseAllModals => {
                state.is_show_additional_modal = false;
                state.is_show_delete_profile_modal = false;
                state.is_show_cache_delete_modal = false;
                state.is_show_successfully_delete_cache_modal = false;
                state.is_show_error_modal = false;
                state.is_show_document_view = false;
            }
            Action::DeleteUser => {
                state.is_loading = true;
                return vec![Effect::DeleteAccount];
            }
            Action::DeleteUserResponse(outcome) => {
                state.is_loading = false;
                return self.finish_deletion(state, outcome);
            }
            Action::DeleteCache => {
                state.is_loading = true;
                state.is_successfully_deleted_cache = self.cache.clean_files();
                self.cache.wipe_store(true);
                state.is_loading = false;
                if !state.is_successfully_deleted_cache {
                    log::warn!("Cache was only partially removed, reporting success anyway.");
                }
                state.is_show_cache_delete_modal = false;
                state.is_show_successfully_delete_cache_modal = true;
            }
            Action::UpdateDocumentType(document_type) => {
                state.document_type = document_type;
                return vec![Effect::Send(Action::ShowDocumentView)];
            }
            Action::ShowErrorModal => state.is_show_error_modal = !state.is_show_error_modal,
            Action::PresentErrorModal => state.is_show_error_modal = true,
            Action::ErrorHandling => {
                return vec![
                    Effect::Notify(ChildFlow::Home, ChildCommand::ErrorHandling),
                    Effect::Send(Action::ShowErrorModal),
                ];
            }
        }
        Vec::new()
    }

    fn finish_deletion(&self, state: &mut State, outcome: DeleteOutcome) -> Vec<Effect> {
        if outcome == DeleteOutcome::Deleted {
            log::info!("Account deleted, clearing local session and data.");
            self.sign_out();
            let _ = self.cache.clean_files();
            self.cache.wipe_store(false);
            return Vec::new();
        }

        log::error!("Account deletion failed: {:?}", outcome);
        state.error_message = Some(outcome.message().to_string());
        let mut effects = Vec::with_capacity(2);
        if state.is_show_delete_profile_modal {
            effects.push(Effect::Send(Action::PresentDeleteModal));
        }
        effects.push(Effect::Send(Action::PresentErrorModal));
        effects
    }

    fn sign_out(&self) {
        for key in [ACCESS_TOKEN, REFRESH_TOKEN] {
            if let Err(e) = self.session.set_credential(key, "") {
                log::error!("Failed to clear '{}': {}", key, e);
            }
        }
        if let Err(e) = self.session.set_needs_reauth(true) {
            log::error!("Failed to persist re-auth flag: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CacheCall, MemoryCache, MemorySession};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn reducer(clean_result: bool) -> Reducer<MemorySession, MemoryCache> {
        Reducer::new(
            Arc::new(MemorySession::with_tokens("access", "refresh")),
            MemoryCache::new(clean_result, "1.5 MB"),
        )
    }

    #[test]
    fn delete_user_starts_loading_and_requests_deletion() {
        let mut state = State::default();
        let effects = reducer(true).reduce(&mut state, Action::DeleteUser);
        assert!(state.is_loading);
        assert_eq!(effects, vec![Effect::DeleteAccount]);
    }

    #[rstest]
    #[case(false, false)]
    #[case(true, false)]
    #[case(false, true)]
    #[case(true, true)]
    fn successful_deletion_signs_out_regardless_of_modals(
        #[case] delete_modal: bool,
        #[case] error_modal: bool,
    ) {
        let reducer = reducer(true);
        let mut state = State {
            is_loading: true,
            is_show_delete_profile_modal: delete_modal,
            is_show_error_modal: error_modal,
            ..State::default()
        };
        let before = state.clone();

        let effects =
            reducer.reduce(&mut state, Action::DeleteUserResponse(DeleteOutcome::Deleted));

        assert_eq!(effects, vec![]);
        assert_eq!(state, State { is_loading: false, ..before });
        assert_eq!(reducer.session.credential(ACCESS_TOKEN), Some(String::new()));
        assert_eq!(reducer.session.credential(REFRESH_TOKEN), Some(String::new()));
        assert!(reducer.session.needs_reauth());
        assert_eq!(
            reducer.cache.calls(),
            vec![CacheCall::CleanFiles, CacheCall::WipeStore { routes_only: false }]
        );
    }

    #[test]
    fn failed_deletion_reopens_confirmation_before_error() {
        let reducer = reducer(true);
        let mut state = State {
            is_loading: true,
            is_show_delete_profile_modal: true,
            ..State::default()
        };

        let effects = reducer.reduce(
            &mut state,
            Action::DeleteUserResponse(DeleteOutcome::Failed(RequestError::Server)),
        );

        assert!(!state.is_loading);
        assert_eq!(state.error_message.as_deref(), Some("Something went wrong"));
        assert_eq!(
            effects,
            vec![
                Effect::Send(Action::PresentDeleteModal),
                Effect::Send(Action::PresentErrorModal)
            ]
        );
        for effect in effects {
            if let Effect::Send(action) = effect {
                assert_eq!(reducer.reduce(&mut state, action), vec![]);
            }
        }
        assert!(state.is_show_delete_profile_modal);
        assert!(state.is_show_error_modal);
        assert_eq!(reducer.session.credential(ACCESS_TOKEN), Some("access".into()));
        assert!(!reducer.session.needs_reauth());
        assert_eq!(reducer.cache.calls(), vec![]);
    }

    #[rstest]
    #[case(DeleteOutcome::Failed(RequestError::Unknown))]
    #[case(DeleteOutcome::Rejected { status_code: None })]
    fn failed_deletion_without_confirmation_only_opens_error(#[case] outcome: DeleteOutcome) {
        let mut state = State::default();
        let effects = reducer(true).reduce(&mut state, Action::DeleteUserResponse(outcome));
        assert_eq!(effects, vec![Effect::Send(Action::PresentErrorModal)]);
        assert_eq!(state.error_message.as_deref(), Some("Unknown error"));
    }

    #[rstest]
    fn close_all_modals_clears_every_flag(
        #[values(false, true)] additional: bool,
        #[values(false, true)] delete: bool,
        #[values(false, true)] cache: bool,
        #[values(false, true)] success: bool,
        #[values(false, true)] error: bool,
    ) {
        let mut state = State {
            is_show_additional_modal: additional,
            is_show_delete_profile_modal: delete,
            is_show_cache_delete_modal: cache,
            is_show_successfully_delete_cache_modal: success,
            is_show_error_modal: error,
            is_show_document_view: true,
            ..State::default()
        };
        let effects = reducer(true).reduce(&mut state, Action::CloseAllModals);
        assert_eq!(effects, vec![]);
        assert!(!state.any_modal_open());
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn delete_cache_always_reports_success(#[case] clean_result: bool) {
        let reducer = reducer(clean_result);
        let mut state = State {
            is_show_cache_delete_modal: true,
            ..State::default()
        };

        let effects = reducer.reduce(&mut state, Action::DeleteCache);

        assert_eq!(effects, vec![]);
        assert!(!state.is_loading);
        assert!(!state.is_show_cache_delete_modal);
        assert!(state.is_show_successfully_delete_cache_modal);
        assert_eq!(state.is_successfully_deleted_cache, clean_result);
        assert_eq!(
            reducer.cache.calls(),
            vec![CacheCall::CleanFiles, CacheCall::WipeStore { routes_only: true }]
        );
    }

    #[test]
    fn options_modal_refreshes_cache_size() {
        let reducer = reducer(true);
        let mut state = State::default();
        reducer.reduce(&mut state, Action::AdditionalyTapped);
        assert!(state.is_show_additional_modal);
        assert_eq!(state.size_all_files, "1.5 MB");
        reducer.reduce(&mut state, Action::AdditionalyTapped);
        assert!(!state.is_show_additional_modal);
    }

    #[rstest]
    #[case(Action::ShowDeleteModal, |s: &State| s.is_show_delete_profile_modal)]
    #[case(Action::ShowCacheDeleteModal, |s: &State| s.is_show_cache_delete_modal)]
    #[case(
        Action::ShowSuccessfullyDeleteCacheModal,
        |s: &State| s.is_show_successfully_delete_cache_modal
    )]
    fn show_actions_toggle_and_close_options(
        #[case] action: Action,
        #[case] flag: fn(&State) -> bool,
    ) {
        let reducer = reducer(true);
        let mut state = State {
            is_show_additional_modal: true,
            ..State::default()
        };
        reducer.reduce(&mut state, action.clone());
        assert!(flag(&state));
        assert!(!state.is_show_additional_modal);
        reducer.reduce(&mut state, action);
        assert!(!flag(&state));
    }

    #[test]
    fn delete_profile_tapped_only_closes_options() {
        let mut state = State {
            is_show_additional_modal: true,
            ..State::default()
        };
        let effects = reducer(true).reduce(&mut state, Action::DeleteProfileTapped);
        assert_eq!(effects, vec![]);
        assert_eq!(state, State::default());
    }

    #[rstest]
    #[case(
        Action::CancelDeleteProfileTapped,
        |s: &State| s.is_show_delete_profile_modal,
        |s: &State| s.is_show_cache_delete_modal
    )]
    #[case(
        Action::CancelCacheDeleteTapped,
        |s: &State| s.is_show_cache_delete_modal,
        |s: &State| s.is_show_delete_profile_modal
    )]
    fn cancelling_returns_to_options(
        #[case] action: Action,
        #[case] closed: fn(&State) -> bool,
        #[case] untouched: fn(&State) -> bool,
    ) {
        let mut state = State {
            is_show_delete_profile_modal: true,
            is_show_cache_delete_modal: true,
            ..State::default()
        };
        reducer(true).reduce(&mut state, action);
        assert!(state.is_show_additional_modal);
        assert!(!closed(&state));
        assert!(untouched(&state));
    }

    #[test]
    fn selecting_map_notifies_map_flow() {
        let reducer = reducer(true);
        let mut state = State::default();
        assert_eq!(
            reducer.reduce(&mut state, Action::TabSelected(TabBarItem::Map)),
            vec![Effect::Notify(ChildFlow::Map, ChildCommand::Appeared)]
        );
        assert_eq!(state.selected_tab, TabBarItem::Map);
        assert_eq!(reducer.reduce(&mut state, Action::TabSelected(TabBarItem::Profile)), vec![]);
        assert_eq!(state.selected_tab, TabBarItem::Profile);
    }

    #[rstest]
    #[case(ChildEvent::HideTabBar, Action::HideTabBar)]
    #[case(ChildEvent::ShowTabBar, Action::ShowTabBar)]
    #[case(ChildEvent::ShowWarningModal, Action::ShowErrorModal)]
    #[case(ChildEvent::OrderExcursionTapped, Action::ShowErrorModal)]
    fn child_events_are_forwarded(#[case] event: ChildEvent, #[case] expected: Action) {
        for flow in [ChildFlow::Home, ChildFlow::Map, ChildFlow::Profile] {
            let mut state = State::default();
            assert_eq!(
                reducer(true).reduce(&mut state, Action::Child(flow, event)),
                vec![Effect::Send(expected.clone())]
            );
        }
    }

    #[test]
    fn tab_bar_visibility() {
        let reducer = reducer(true);
        let mut state = State::default();
        reducer.reduce(&mut state, Action::HideTabBar);
        assert!(state.tab_bar_is_hidden);
        reducer.reduce(&mut state, Action::ShowTabBar);
        assert!(!state.tab_bar_is_hidden);
    }

    #[test]
    fn updating_document_type_opens_document() {
        let reducer = reducer(true);
        let mut state = State::default();
        let effects =
            reducer.reduce(&mut state, Action::UpdateDocumentType(DocumentType::UserAgreement));
        assert_eq!(state.document_type, DocumentType::UserAgreement);
        assert_eq!(effects, vec![Effect::Send(Action::ShowDocumentView)]);
    }

    #[test]
    fn error_handling_notifies_home_then_shows_error() {
        let mut state = State::default();
        assert_eq!(
            reducer(true).reduce(&mut state, Action::ErrorHandling),
            vec![
                Effect::Notify(ChildFlow::Home, ChildCommand::ErrorHandling),
                Effect::Send(Action::ShowErrorModal)
            ]
        );
    }

    #[rstest]
    #[case(Ok(Some(StatusCode { status_code: 200 })), DeleteOutcome::Deleted)]
    #[case(Ok(Some(StatusCode { status_code: 299 })), DeleteOutcome::Deleted)]
    #[case(
        Ok(Some(StatusCode { status_code: 302 })),
        DeleteOutcome::Rejected { status_code: Some(302) }
    )]
    #[case(Ok(None), DeleteOutcome::Rejected { status_code: None })]
    #[case(Err(RequestError::Unauthorized), DeleteOutcome::Failed(RequestError::Unauthorized))]
    fn outcome_from_request_result(
        #[case] result: RequestResult<StatusCode>,
        #[case] expected: DeleteOutcome,
    ) {
        assert_eq!(DeleteOutcome::from(result), expected);
    }

    #[test]
    fn tab_items() {
        assert_eq!(TabBarItem::Additionaly.image(), "additionally");
        assert!(!TabBarItem::Additionaly.is_active());
        assert!(TabBarItem::Map.is_active());
    }
}
