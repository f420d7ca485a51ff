mod apply;
mod config;
mod messy;
mod planner;
mod rename_log;
mod scan;
mod select;
mod template;

pub use apply::{
    apply_plan, plan_undo, undo_from_log, ApplyError, ApplyResult, ExecState, StrandedFile,
    UndoError, UndoResult,
};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
    DEFAULT_PREVIEW_LIMIT,
};
pub use messy::{contains_cjk, MessyRules, MessySignal};
pub use planner::{plan_renames, CollisionError, PlanEntry, RenamePlan};
pub use rename_log::{read_log, write_log, LogEntry, LogError, RenameLog};
pub use scan::{is_image, scan_directory, DirListing, ScanError, ScanStats, IMAGE_EXTENSIONS};
pub use select::{
    messy_candidates, parse_prefixes, propose_prefix, select_by_prefix, select_files,
    sort_filenames, PrefixProposal, Selection, SelectionCriteria,
};
pub use template::{compile_template, render_name, Segment, Template, TemplateError};
