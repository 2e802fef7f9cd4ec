//! Fixed names the mock dataset is built from.

pub const DEFAULT_ORGANIZATION_SLUG: &str = "sentry";
pub const DEFAULT_ORGANIZATION_NAME: &str = "Sentry";

/// The organization's own team and project, skipped by `skip_default_setup`.
pub const DEFAULT_TEAM: TeamFixture = TeamFixture {
    name: "Sentry",
    projects: &["Internal"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamFixture {
    pub name: &'static str,
    pub projects: &'static [&'static str],
}

pub const MOCK_TEAMS: &[TeamFixture] = &[
    TeamFixture {
        name: "Massive Dynamic",
        projects: &["Ludic Science"],
    },
    TeamFixture {
        name: "Captain Planet",
        projects: &["Earth", "Fire", "Wind", "Water", "Heart"],
    },
];

pub const REPOSITORY: &str = "example/example";

/// (name, email)
pub const AUTHORS: &[(&str, &str)] = &[
    ("Ada Lovelace", "ada@example.com"),
    ("Grace Hopper", "grace@example.com"),
    ("Alan Turing", "alan@example.com"),
    ("Edsger Dijkstra", "edsger@example.com"),
    ("Barbara Liskov", "barbara@example.com"),
];

pub const FILES: &[&str] = &[
    "src/app/__init__.py",
    "src/app/models.py",
    "src/app/views.py",
    "src/app/tasks/cleanup.py",
    "static/app/index.js",
    "static/app/components/header.jsx",
    "config/settings.yml",
    "README.md",
];

pub const COMMIT_MESSAGES: &[&str] = &[
    "fix: handle missing user in session middleware",
    "feat: add pagination to issue list",
    "ref: split tasks module",
    "fix: guard against empty payloads",
    "chore: bump dependencies",
    "feat: support release filtering",
];

/// File change types: added, modified, deleted.
pub const CHANGE_TYPES: &[char] = &['A', 'M', 'D'];

/// Culprit (transaction/location) used for sample events of a platform.
pub fn culprit_for(platform: &str) -> &'static str {
    match platform {
        "ruby" => "app/models/user.rb in save",
        "php" => "src/Controller/AccountController.php in index",
        "python" => "app.views in handle_request",
        "java" => "com.example.app.Controller in handle",
        "javascript" => "app/components/header in render",
        _ => "unknown",
    }
}

/// Lowercase, with runs of non-alphanumerics collapsed to `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
