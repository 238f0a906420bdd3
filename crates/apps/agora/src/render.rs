//! Text rendering of a forum index

use chrono::{DateTime, Local, TimeZone, Utc};
use forum::{DiscussionItem, ForumIndex, ListStatus, OfflineDiscussion, OnlineDiscussion};
use serde::Serialize;

/// Format a unix timestamp for display (e.g., "Mar 5, 14:02")
pub fn format_timestamp(timestamp: i64) -> String {
    match Utc.timestamp_opt(timestamp, 0).single() {
        Some(time) => format_date(time.with_timezone(&Local)),
        None => "-".to_string(),
    }
}

fn format_date(time: DateTime<Local>) -> String {
    time.format("%b %-d, %H:%M").to_string()
}

fn flags(discussion: &OnlineDiscussion) -> String {
    let mut flags = String::new();
    if discussion.pinned {
        flags.push('P');
    }
    if discussion.locked {
        flags.push('L');
    }
    if discussion.starred {
        flags.push('*');
    }
    flags
}

fn online_line(discussion: &OnlineDiscussion) -> String {
    let mut line = format!(
        "#{:<6} {:<4} {:<40} {:>3} replies",
        discussion.discussion,
        flags(discussion),
        discussion.subject,
        discussion.num_replies
    );
    if discussion.num_unread > 0 {
        line.push_str(&format!(" ({} unread)", discussion.num_unread));
    }
    if let Some(author) = &discussion.author {
        line.push_str(&format!("  by {}", author));
    }
    if let Some(group) = &discussion.group_name {
        line.push_str(&format!("  [{}]", group));
    }
    line.push_str(&format!("  {}", format_timestamp(discussion.created)));
    line
}

fn offline_line(discussion: &OfflineDiscussion) -> String {
    let mut line = format!(
        "offline      {:<40} not sent  {}",
        discussion.subject,
        format_timestamp(discussion.time_created)
    );
    if discussion.has_attachments {
        line.push_str("  +attachments");
    }
    line
}

/// One line per list item, the selected one marked with `>`
pub fn render_list(index: &ForumIndex) -> Vec<String> {
    index
        .list()
        .items()
        .iter()
        .map(|item| {
            let marker = if index.selection().is_selected(&item.key()) {
                '>'
            } else {
                ' '
            };
            let body = match item {
                DiscussionItem::Online(discussion) => online_line(discussion),
                DiscussionItem::Offline(discussion) => offline_line(discussion),
                DiscussionItem::NewDiscussion => "(new discussion)".to_string(),
            };
            format!("{} {}", marker, body)
        })
        .collect()
}

fn status_label(status: &ListStatus) -> String {
    match status {
        ListStatus::Idle => "idle".to_string(),
        ListStatus::Loading => "loading".to_string(),
        ListStatus::Loaded => "loaded".to_string(),
        ListStatus::Errored(message) => format!("error: {}", message),
    }
}

/// Print the forum header, the list and the selection
pub fn print_index(index: &ForumIndex) {
    if let Some(forum) = index.forum() {
        println!("{} ({:?})", forum.name, forum.forum_type);
        if let Some(message) = forum.availability_message(Utc::now()) {
            println!("  {}", message);
        }
        if index.context().can_add_discussion {
            println!("  + {}", forum.forum_type.new_discussion_label());
        }
    }
    println!(
        "  status: {}, sorted by: {}",
        status_label(index.status()),
        index.sort_order().label()
    );

    for line in render_list(index) {
        println!("{}", line);
    }

    let more = if index.load_more_error() {
        "load more failed, retry manually"
    } else if index.can_load_more() {
        "more discussions available"
    } else {
        "end of list"
    };
    println!("  -- {} --", more);

    match index.selected_path() {
        Some(path) if index.selected_item().is_some() => println!("  selected: {}", path),
        Some(path) => println!("  selected: {} (no longer listed)", path),
        None => println!("  selected: none"),
    }
}

/// Machine-readable state of a forum index
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub forum: Option<String>,
    pub status: String,
    pub sort_order: i32,
    pub items: Vec<String>,
    pub selected: Option<String>,
    pub can_load_more: bool,
    pub load_more_error: bool,
    pub track_posts: bool,
    pub has_offline: bool,
    pub navigation: Vec<String>,
}

impl Snapshot {
    pub fn capture(index: &ForumIndex, navigation: Vec<String>) -> Self {
        Self {
            forum: index.forum().map(|forum| forum.name.clone()),
            status: status_label(index.status()),
            sort_order: index.sort_order().value(),
            items: index
                .list()
                .items()
                .iter()
                .map(|item| index.paths().path_for(item))
                .collect(),
            selected: index.selected_path(),
            can_load_more: index.can_load_more(),
            load_more_error: index.load_more_error(),
            track_posts: index.track_posts(),
            has_offline: index.has_offline(),
            navigation,
        }
    }
}
