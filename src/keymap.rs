//! Data-driven keybinding configuration
//!
//! All keybindings are defined as data in `KeyMap::default()`, not as match
//! arms scattered across components. To add a binding, add an entry to the
//! appropriate context and handle the `KeyAction` in `App::apply_key_action()`.
//! Dialogs and the palette read raw keys and are not listed here.

use crate::app::FocusArea;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

/// A key combination (code + modifiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBind {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBind {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

impl From<KeyEvent> for KeyBind {
    /// Shift is already part of the character (`G`, `?`) and of `BackTab`,
    /// and terminals disagree on whether they report it, so it is dropped
    fn from(event: KeyEvent) -> Self {
        let mut modifiers = event.modifiers;
        if matches!(event.code, KeyCode::Char(_) | KeyCode::BackTab) {
            modifiers.remove(KeyModifiers::SHIFT);
        }
        Self {
            code: event.code,
            modifiers,
        }
    }
}

/// Semantic key actions: what a key means, not what key it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    // Global
    Quit,
    OpenPalette,
    OpenConnectionDialog,
    OpenFavorites,
    Help,
    CycleFocus,
    CycleFocusReverse,
    NewTab,
    CloseTab,
    NextTab,
    CancelQuery,

    // Navigation (shared by tree and data panel)
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,
    Home,
    End,

    // Tree
    Activate,
    ToggleExpand,
    Expand,
    Collapse,
    RefreshNode,

    // Data panel
    CycleSort,
    ToggleNullsFirst,
    ReverseSort,
    OpenFilter,
    ClearFilter,
    OpenSearch,
    OpenCellViewer,
    SwitchDataView,
    Dismiss,

    // Editor
    ExecuteQuery,
    ClearEditor,
    HistoryPrev,
    HistoryNext,
}

/// Keybinding configuration: maps key combos to semantic actions per context.
pub struct KeyMap {
    /// Bindings that apply regardless of focus (checked first)
    global: HashMap<KeyBind, KeyAction>,
    /// Per-panel bindings (checked after global)
    panels: HashMap<FocusArea, HashMap<KeyBind, KeyAction>>,
}

impl KeyMap {
    /// Resolve a key event to a semantic action.
    /// Checks global bindings first, then panel-specific bindings.
    pub fn resolve(&self, focus: FocusArea, key: KeyEvent) -> Option<KeyAction> {
        let bind = KeyBind::from(key);
        if let Some(action) = self.global.get(&bind) {
            return Some(*action);
        }
        self.panels
            .get(&focus)
            .and_then(|m| m.get(&bind))
            .copied()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        let global = HashMap::from([
            (KeyBind::ctrl('q'), KeyAction::Quit),
            (KeyBind::ctrl('p'), KeyAction::OpenPalette),
            (KeyBind::ctrl('o'), KeyAction::OpenConnectionDialog),
            (KeyBind::ctrl('b'), KeyAction::OpenFavorites),
            (KeyBind::ctrl('t'), KeyAction::NewTab),
            (KeyBind::ctrl('w'), KeyAction::CloseTab),
            (KeyBind::ctrl('n'), KeyAction::NextTab),
            (KeyBind::ctrl('c'), KeyAction::CancelQuery),
            (KeyBind::plain(KeyCode::F(1)), KeyAction::Help),
            (KeyBind::plain(KeyCode::Tab), KeyAction::CycleFocus),
            (KeyBind::plain(KeyCode::BackTab), KeyAction::CycleFocusReverse),
        ]);

        let mut panels = HashMap::new();

        // ── Tree ─────────────────────────────────────────────────
        let mut tree = HashMap::new();
        insert_scroll_nav(&mut tree);
        tree.extend([
            (KeyBind::plain(KeyCode::Enter), KeyAction::Activate),
            (KeyBind::plain(KeyCode::Char(' ')), KeyAction::ToggleExpand),
            (KeyBind::plain(KeyCode::Char('l')), KeyAction::Expand),
            (KeyBind::plain(KeyCode::Right), KeyAction::Expand),
            (KeyBind::plain(KeyCode::Char('h')), KeyAction::Collapse),
            (KeyBind::plain(KeyCode::Left), KeyAction::Collapse),
            (KeyBind::plain(KeyCode::Char('R')), KeyAction::RefreshNode),
            (KeyBind::plain(KeyCode::Char('?')), KeyAction::Help),
        ]);
        panels.insert(FocusArea::TreeView, tree);

        // ── Data panel ───────────────────────────────────────────
        let mut data = HashMap::new();
        insert_vim_nav(&mut data);
        data.extend([
            (KeyBind::plain(KeyCode::Char('s')), KeyAction::CycleSort),
            (KeyBind::plain(KeyCode::Char('S')), KeyAction::ToggleNullsFirst),
            (KeyBind::plain(KeyCode::Char('r')), KeyAction::ReverseSort),
            (KeyBind::plain(KeyCode::Char('f')), KeyAction::OpenFilter),
            (KeyBind::plain(KeyCode::Char('F')), KeyAction::ClearFilter),
            (KeyBind::plain(KeyCode::Char('/')), KeyAction::OpenSearch),
            (KeyBind::plain(KeyCode::Enter), KeyAction::OpenCellViewer),
            (KeyBind::plain(KeyCode::Char('v')), KeyAction::SwitchDataView),
            (KeyBind::plain(KeyCode::Esc), KeyAction::Dismiss),
            (KeyBind::plain(KeyCode::Char('?')), KeyAction::Help),
        ]);
        panels.insert(FocusArea::DataPanel, data);

        // ── Editor ───────────────────────────────────────────────
        let editor = HashMap::from([
            (KeyBind::plain(KeyCode::F(5)), KeyAction::ExecuteQuery),
            (
                KeyBind::new(KeyCode::Enter, KeyModifiers::CONTROL),
                KeyAction::ExecuteQuery,
            ),
            (KeyBind::ctrl('l'), KeyAction::ClearEditor),
            (
                KeyBind::new(KeyCode::Up, KeyModifiers::CONTROL),
                KeyAction::HistoryPrev,
            ),
            (
                KeyBind::new(KeyCode::Down, KeyModifiers::CONTROL),
                KeyAction::HistoryNext,
            ),
        ]);
        panels.insert(FocusArea::QueryEditor, editor);

        Self { global, panels }
    }
}

/// Insert vim-style navigation bindings (arrows + hjkl + page + g/G + Home/End)
fn insert_vim_nav(map: &mut HashMap<KeyBind, KeyAction>) {
    insert_scroll_nav(map);
    map.extend([
        (KeyBind::plain(KeyCode::Right), KeyAction::MoveRight),
        (KeyBind::plain(KeyCode::Char('l')), KeyAction::MoveRight),
        (KeyBind::plain(KeyCode::Left), KeyAction::MoveLeft),
        (KeyBind::plain(KeyCode::Char('h')), KeyAction::MoveLeft),
        (KeyBind::plain(KeyCode::Home), KeyAction::Home),
        (KeyBind::plain(KeyCode::End), KeyAction::End),
    ]);
}

/// Insert vertical navigation bindings (arrows + jk + page + g/G)
fn insert_scroll_nav(map: &mut HashMap<KeyBind, KeyAction>) {
    map.extend([
        (KeyBind::plain(KeyCode::Down), KeyAction::MoveDown),
        (KeyBind::plain(KeyCode::Char('j')), KeyAction::MoveDown),
        (KeyBind::plain(KeyCode::Up), KeyAction::MoveUp),
        (KeyBind::plain(KeyCode::Char('k')), KeyAction::MoveUp),
        (KeyBind::plain(KeyCode::PageDown), KeyAction::PageDown),
        (KeyBind::plain(KeyCode::PageUp), KeyAction::PageUp),
        (KeyBind::plain(KeyCode::Char('g')), KeyAction::GoToTop),
        (KeyBind::plain(KeyCode::Char('G')), KeyAction::GoToBottom),
        (KeyBind::plain(KeyCode::Home), KeyAction::GoToTop),
        (KeyBind::plain(KeyCode::End), KeyAction::GoToBottom),
    ]);
}
