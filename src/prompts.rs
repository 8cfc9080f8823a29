use crate::github::{PullRequestDetails, RepoName};

const NO_THINK: &str = "/nothink";

fn directive(think: bool) -> &'static str {
    if think {
        ""
    } else {
        NO_THINK
    }
}

pub fn analysis_system(repo: &RepoName, model_id: &str, think: bool) -> String {
    format!(
        "{}\nYou are a security reviewer for the GitHub repository {}. \
         You receive the metadata and diff of one pull request. \
         you are using: model={}",
        directive(think),
        repo,
        model_id
    )
}

pub fn analysis_prompt(pr: &PullRequestDetails, max_diff_chars: usize, think: bool) -> String {
    format!(
        "{}\nInstructions:\n\
         1. Read the pull request below.\n\
         2. Make note of anything that is a security risk and that could be used to exploit the system.\n\n\
         Pull request #{}: {}\n\
         Author: {}\nState: {}\nMerging {} into {}\n\n\
         Description:\n{}\n\n\
         Diff:\n{}",
        directive(think),
        pr.number,
        pr.title,
        pr.author,
        pr.state,
        pr.head,
        pr.base,
        if pr.body.is_empty() { "(none)" } else { pr.body.as_str() },
        truncate_chars(&pr.diff(), max_diff_chars),
    )
}

pub fn comment_system(repo: &RepoName, model_id: &str, think: bool) -> String {
    format!(
        "{}\nYou write pull request review comments for the GitHub repository {}. \
         Reply with the comment text only. \
         you are using: model={}",
        directive(think),
        repo,
        model_id
    )
}

pub fn comment_prompt(pr_number: u64, analysis: &str, think: bool) -> String {
    format!(
        "{}\nGoal: based on the content create 1 (one) pull request comment with security issues \
         for pull request #{}.\n\
         Based on the content add your recommendations whether it should be merged or not.\n\n\
         content: {}\n",
        directive(think),
        pr_number,
        analysis
    )
}

/// Cut `text` to at most `max` characters, marking the cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let omitted = text[byte_idx..].chars().count();
            format!("{}\n[diff truncated, {} characters omitted]\n", &text[..byte_idx], omitted)
        }
    }
}
