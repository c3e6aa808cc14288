use opsdesk_contract::FileRecord;

/// Records whose file name or id contains `term`, ignoring case. An empty
/// term keeps everything. Input order is preserved.
pub fn filter_files<'a>(files: &'a [FileRecord], term: &str) -> Vec<&'a FileRecord> {
    if term.is_empty() {
        return files.iter().collect();
    }

    let needle = term.to_lowercase();
    files
        .iter()
        .filter(|file| {
            file.file_name.to_lowercase().contains(&needle)
                || file.id.to_lowercase().contains(&needle)
        })
        .collect()
}
