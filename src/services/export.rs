//! CSV export of article listings
//!
//! Output starts with a UTF-8 byte order mark so spreadsheet tools detect
//! the encoding. Fields are quoted only when they contain a delimiter,
//! quote or line break.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::db::repositories::ArticleRepository;
use crate::models::{ArticleExportRow, ArticleFilter};
use crate::services::ServiceResult;

/// UTF-8 byte order mark
pub const CSV_BOM: &str = "\u{FEFF}";

const HEADER: [&str; 9] = [
    "Title",
    "Status",
    "Client",
    "Category",
    "Author",
    "Views",
    "Created Date",
    "Published Date",
    "Scheduled Date",
];

/// Quote a field when it contains `,`, `"`, CR or LF; inner quotes are doubled
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn date(value: Option<DateTime<Utc>>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn csv_line<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| csv_escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render rows as a BOM-prefixed CSV document with a header line
pub fn render_articles_csv(rows: &[ArticleExportRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(csv_line(HEADER));
    for row in rows {
        lines.push(csv_line([
            row.title.clone(),
            row.status.to_string(),
            row.client_name.clone().unwrap_or_default(),
            row.category_name.clone().unwrap_or_default(),
            row.author_name.clone().unwrap_or_default(),
            row.view_count.to_string(),
            date(Some(row.created_at)),
            date(row.published_at),
            date(row.scheduled_at),
        ]));
    }
    format!("{}{}", CSV_BOM, lines.join("\n"))
}

pub struct ExportService {
    repo: Arc<dyn ArticleRepository>,
}

impl ExportService {
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo }
    }

    pub async fn export_articles_csv(&self, tenant_id: i64, filter: &ArticleFilter) -> ServiceResult<String> {
        let rows = self
            .repo
            .export_rows(tenant_id, filter)
            .await
            .context("Failed to load articles for export")?;
        tracing::info!("Exporting {} article(s) for tenant {}", rows.len(), tenant_id);
        Ok(render_articles_csv(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxArticleRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::ArticleStatus;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn row(title: &str) -> ArticleExportRow {
        ArticleExportRow {
            title: title.to_string(),
            status: ArticleStatus::Published,
            client_name: Some("Acme, Inc.".to_string()),
            category_name: None,
            author_name: Some("Ada".to_string()),
            view_count: 12,
            created_at: Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 1, 6, 23, 59, 0).unwrap()),
            scheduled_at: None,
        }
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("two\nlines"), "\"two\nlines\"");
        assert_eq!(csv_escape("cr\r"), "\"cr\r\"");
        assert_eq!(csv_escape(""), "");
    }

    #[test]
    fn test_render_articles_csv() {
        let csv = render_articles_csv(&[row("Hello \"World\"")]);
        assert!(csv.as_bytes().starts_with(&[0xEF, 0xBB, 0xBF]));

        let body = csv.trim_start_matches(CSV_BOM);
        let lines: Vec<&str> = body.split('\n').collect();
        assert_eq!(
            lines[0],
            "Title,Status,Client,Category,Author,Views,Created Date,Published Date,Scheduled Date"
        );
        assert_eq!(
            lines[1],
            "\"Hello \"\"World\"\"\",published,\"Acme, Inc.\",,Ada,12,2024-01-05,2024-01-06,"
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_render_empty_has_header_only() {
        let csv = render_articles_csv(&[]);
        assert_eq!(csv.trim_start_matches(CSV_BOM).lines().count(), 1);
    }

    #[tokio::test]
    async fn test_export_service_uses_filter() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool.execute(
            "INSERT INTO articles (tenant_id, slug, title, content, content_html, status) \
             VALUES (1, 'a', 'Live one', 'c', '', 'published'), (1, 'b', 'Draft one', 'c', '', 'draft')",
        )
        .await
        .unwrap();

        let service = ExportService::new(SqlxArticleRepository::boxed(pool));
        let filter = ArticleFilter {
            status: Some(ArticleStatus::Published),
            ..Default::default()
        };
        let csv = service.export_articles_csv(1, &filter).await.unwrap();
        assert!(csv.contains("Live one"));
        assert!(!csv.contains("Draft one"));
    }

    proptest! {
        #[test]
        fn prop_escape_is_reversible(field in "[ -~\r\n]{0,40}") {
            let escaped = csv_escape(&field);
            let special = field.contains([',', '"', '\r', '\n']);
            if special {
                prop_assert!(escaped.starts_with('"') && escaped.ends_with('"'));
                let inner = &escaped[1..escaped.len() - 1];
                prop_assert_eq!(inner.replace("\"\"", "\""), field);
            } else {
                prop_assert_eq!(escaped, field);
            }
        }
    }
}
