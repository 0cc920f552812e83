/// File and directory names making up the storage layout.
pub const LOCK_FILE_NAME: &str = "scraper.pid";
pub const STATUS_FILE_NAME: &str = "run-status.json";
pub const SOURCES_DIR: &str = "sources";
pub const PROCESSED_DIR: &str = "processed";
pub const DEFAULT_DATA_DIR: &str = "data";

// Default source registry, in fetch order: (file name, url)
pub const DEFAULT_SOURCES: &[(&str, &str)] = &[
    (
        "data_mtl.html",
        "https://santemontreal.qc.ca/population/coronavirus-covid-19/",
    ),
    // Main page for the next three is https://www.inspq.qc.ca/covid-19/donnees
    (
        "data_qc.csv",
        "https://www.inspq.qc.ca/sites/default/files/covid/donnees/combine.csv",
    ),
    (
        "data_qc_case_by_network.csv",
        "https://www.inspq.qc.ca/sites/default/files/covid/donnees/tableau-rls.csv",
    ),
    (
        "data_qc_death_loc_by_reg.csv",
        "https://www.inspq.qc.ca/sites/default/files/covid/donnees/tableau-rpa.csv",
    ),
];

// Table schema of the Montréal page
pub const DEFAULT_SCHEMA_SOURCE: &str = "data_mtl.html";
pub const DEFAULT_TABLE_CLASS: &str = "contenttable";
pub const DEFAULT_INFO_BGCOLOR: &str = "#A1C8E7";
pub const DEFAULT_TABLE_FILES: &[&str] = &[
    "mtl_ciusss.csv",
    "mtl_borough.csv",
    "mtl_ages.csv",
    "mtl_gender.csv",
];

// Fetch policy
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("healthstat-scraper/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_CHARSET: &str = "utf-8";
