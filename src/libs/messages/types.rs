/// Every user-facing message of the CLI.
///
/// Text lives in the [`Display`](std::fmt::Display) implementation in
/// `display.rs`; callers only pick a variant and fill in its parameters.
#[derive(Debug, Clone)]
pub enum Message {
    // === CONFIGURATION ===
    ConfigSectionUser,
    ConfigSectionReport,
    ConfigSectionAccess,
    PromptUserId,
    PromptUserName,
    PromptTimeZone,
    PromptRegionCode,
    PromptRequireApproval,
    InvalidTimeZone(String),
    ConfigSaved(String),
    NoIdentityConfigured,

    // === MIGRATIONS ===
    DatabaseUpToDate,
    MigrationsFound(usize),
    RunningMigration(u32, String),
    MigrationCompleted(u32),
    MigrationFailed(u32, String),
    AllMigrationsCompleted,

    // === LOCATIONS ===
    LocationCreated(String, String), // name, id
    LocationRenamed(String),
    LocationDeleted(String),
    LocationsNotFound,
    LocationsHeader,

    // === ENTRIES ===
    CheckedIn(String, String), // location, local time
    CheckedOut(String),        // net duration
    ManualEntryAdded(String),  // net duration
    EntryDeleted(String),
    EntriesNotFound,
    EntriesHeader(String),
    ImportCompleted(usize, usize, usize), // imported, duplicates, rejected
    InvalidImportFile(String),

    // === REPORTS ===
    ReportExported(String),
    NoPendingHours(String),
    NoEntriesForPeriod(String, String),
    EntriesArchived(usize),
    InvalidDate(String),

    // === TEAM ===
    TokenGenerated(String), // expiry, local time
    QrPayloadHint,
    LinkedToWorker(String),
    LinkPendingApproval(String),
    GrantApproved(String),
    GrantRevoked(String),
    NoGrants,
    SharedWithHeader,
    WorkersHeader,

    // === EXPORT ===
    ExportCompleted(String, usize),

    // === GENERIC ===
    CommandFailed(String),
}
