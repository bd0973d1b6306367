//! Ordered candidate URL construction (spec.md §4.D step 2).

use uuid::Uuid;

/// A GitHub `owner/repo.git` URL, broken into its parts.
fn parse_github_owner_repo(repo_url: &str) -> Option<(String, String)> {
    let trimmed = repo_url.trim_end_matches('/');
    let after_host = trimmed
        .split_once("github.com/")
        .or_else(|| trimmed.split_once("github.com:"))
        .map(|(_, rest)| rest)?;
    let without_git_suffix = after_host.strip_suffix(".git").unwrap_or(after_host);
    let mut parts = without_git_suffix.splitn(2, '/');
    let owner = parts.next()?;
    let repo = parts.next()?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_owned(), repo.to_owned()))
}

/// Build the ordered URL list to try for one package install: a
/// package-server URL first (if configured), then a GitHub tarball URL
/// per registered repo URL that matches the `github.com/<owner>/<repo>`
/// pattern.
#[must_use]
pub fn candidate_urls(
    package_server: Option<&str>,
    uuid: Uuid,
    tree_hash_hex: &str,
    repo_urls: &[String],
) -> Vec<String> {
    let mut urls = Vec::new();
    if let Some(server) = package_server {
        let server = server.trim_end_matches('/');
        urls.push(format!("{server}/package/{uuid}/{tree_hash_hex}"));
    }
    for repo_url in repo_urls {
        if let Some((owner, repo)) = parse_github_owner_repo(repo_url) {
            urls.push(format!(
                "https://api.github.com/repos/{owner}/{repo}/tarball/{tree_hash_hex}"
            ));
        }
    }
    urls
}
