//! Subcommand handlers and plain-text rendering.

use std::io::{self, Write};

use anyhow::{Context, Result};
use placemap_core::utils::truncate;
use placemap_core::{BrowseSession, DatasetKind, Place, DEFAULT_CATEGORY};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

const TITLE_WIDTH: usize = 32;
const ADDRESS_WIDTH: usize = 40;

// ============================================================================
// One-shot commands
// ============================================================================

pub fn list(session: &BrowseSession) {
    for kind in DatasetKind::all() {
        let descriptors: Vec<_> = session.catalogue().by_kind(kind).collect();
        if descriptors.is_empty() {
            continue;
        }
        println!("{}s ({})", kind, descriptors.len());
        for d in descriptors {
            println!(
                "  {:<24} {:<width$} {:>4} places",
                d.id,
                truncate(&d.title, TITLE_WIDTH),
                d.place_count,
                width = TITLE_WIDTH
            );
        }
    }
}

pub async fn show(session: &mut BrowseSession, id: &str, day: Option<usize>) -> Result<()> {
    let dataset = session.select(id).await?;
    println!("{} [{}]", dataset.dataset.title, dataset.kind());
    if !dataset.dataset.description.is_empty() {
        println!("{}", dataset.dataset.description);
    }

    match day {
        Some(day) => print_day(session, day)?,
        None => {
            if dataset.dataset.day_count() > 0 {
                println!("{} days", dataset.dataset.day_count());
            }
            print_places(dataset.places());
        }
    }
    Ok(())
}

fn print_day(session: &BrowseSession, day: usize) -> Result<()> {
    let stops = day
        .checked_sub(1)
        .and_then(|index| session.day_stops(index))
        .with_context(|| format!("No day {} in this dataset", day))?;

    println!("Day {}", day);
    for view in stops {
        let transport = view
            .transportation
            .map(|t| format!(" via {}", t.mode))
            .unwrap_or_default();
        let time = view
            .stop
            .time_estimate
            .as_deref()
            .map(|t| format!(" ({})", t))
            .unwrap_or_default();
        println!("  {:>2}. {}{}{}", view.stop.order, view.place.title, time, transport);
        if let Some(memo) = view.stop.memo.as_deref() {
            println!("      {}", memo);
        }
    }
    Ok(())
}

pub async fn facets(session: &mut BrowseSession, id: &str) -> Result<()> {
    session.select(id).await?;
    print_facets(session);
    Ok(())
}

pub async fn filter(
    session: &mut BrowseSession,
    id: &str,
    labels: &[String],
    constraints: &[(String, String)],
) -> Result<()> {
    session.select(id).await?;
    for label in labels {
        session.toggle_filter(DEFAULT_CATEGORY, label);
    }
    for (category, value) in constraints {
        session.toggle_filter(category, value);
    }
    session.settle().await;
    print_places(session.visible_places());
    Ok(())
}

pub async fn search(
    session: &mut BrowseSession,
    id: &str,
    query: &str,
    labels: &[String],
) -> Result<()> {
    session.select(id).await?;
    for label in labels {
        session.toggle_filter(DEFAULT_CATEGORY, label);
    }
    session.set_query(query);
    session.settle().await;
    print_places(session.visible_places());
    Ok(())
}

// ============================================================================
// Interactive session
// ============================================================================

const BROWSE_HELP: &str = "\
Commands:
  open <id>              make a dataset active
  toggle <value>         toggle a label in the default category
  toggle <cat>=<value>   toggle a value in a named category
  search <text>          set the search query (empty clears it)
  clear                  clear every filter
  facets                 show label counts of the active dataset
  day <n>                show the stops of trip day n
  cache                  show resident datasets
  list                   list the catalogue
  quit                   leave";

pub async fn browse(session: &mut BrowseSession) -> Result<()> {
    run_script(session, BufReader::new(tokio::io::stdin())).await
}

/// Run browse commands read line by line from `input` until it ends or a
/// quit command is read.
async fn run_script<R>(session: &mut BrowseSession, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("{}", BROWSE_HELP);
    let mut lines = input.lines();

    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "help" => println!("{}", BROWSE_HELP),
            "list" => list(session),
            "open" => match session.select(rest).await {
                Ok(dataset) => {
                    println!("{} [{}]", dataset.dataset.title, dataset.kind());
                    show_visible(session).await;
                }
                Err(e) => println!("Error: {}", e),
            },
            "toggle" if requires_active(session) => {
                let (category, value) = rest.split_once('=').unwrap_or((DEFAULT_CATEGORY, rest));
                let selected = session.toggle_filter(category.trim(), value.trim());
                println!("{} {}", if selected { "+" } else { "-" }, value.trim());
                show_visible(session).await;
            }
            "search" if requires_active(session) => {
                session.set_query(rest);
                show_visible(session).await;
            }
            "clear" if requires_active(session) => {
                session.clear_filters();
                show_visible(session).await;
            }
            "facets" if requires_active(session) => print_facets(session),
            "day" if requires_active(session) => match rest.parse::<usize>() {
                Ok(day) => {
                    if let Err(e) = print_day(session, day) {
                        println!("Error: {}", e);
                    }
                }
                Err(_) => println!("Usage: day <n>"),
            },
            "cache" => print_cache(session),
            "toggle" | "search" | "clear" | "facets" | "day" => {}
            other => println!("Unknown command '{}', try help", other),
        }
    }
    Ok(())
}

fn requires_active(session: &BrowseSession) -> bool {
    if session.active().is_none() {
        println!("No dataset open, use: open <id>");
        return false;
    }
    true
}

async fn show_visible(session: &mut BrowseSession) {
    session.settle().await;
    if let Some(error) = session.last_error() {
        println!("Error: {}", error);
    }
    print_places(session.visible_places());
}

// ============================================================================
// Rendering
// ============================================================================

fn print_places(places: &[Place]) {
    for place in places {
        println!(
            "  {:<width$} {:<addr$} {}",
            truncate(&place.title, TITLE_WIDTH),
            truncate(&place.address, ADDRESS_WIDTH),
            place.labels_display(),
            width = TITLE_WIDTH,
            addr = ADDRESS_WIDTH
        );
    }
    println!("{} places", places.len());
}

fn print_facets(session: &BrowseSession) {
    for facet in session.facets() {
        let info = session.label_info(&facet.value);
        let marker = if session.selection().is_selected(DEFAULT_CATEGORY, &facet.value) {
            "*"
        } else {
            " "
        };
        println!(
            " {} {:<24} {:>4}  {} {}",
            marker, facet.value, facet.count, info.icon, info.color
        );
    }
}

fn print_cache(session: &BrowseSession) {
    let store = session.store();
    let capacity = store.capacity();
    for kind in DatasetKind::all() {
        let limit = capacity.for_kind(kind);
        let resident = store.resident(kind);
        println!("{}s {}/{}", kind, resident.len(), limit);
        // Most recently used first
        for id in resident.iter().rev() {
            let age = store.entry_age(id).unwrap_or_default();
            println!("  {:<24} loaded {}", id, age);
        }
    }
    println!("{} fetches", store.fetch_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use placemap_core::{Config, MemoryFetcher, ResourceFetcher};

    async fn session() -> BrowseSession {
        let fetcher = MemoryFetcher::new();
        fetcher.insert(
            "maps/cafes.json",
            r#"{"id":"cafes","title":"Cafes","places":[
                {"id":"1","title":"Blue Cafe","labels":["Cafe"],"location":{"lat":33.4,"lng":126.3}},
                {"id":"2","title":"Ocean Grill","labels":["Restaurant"],"location":{"lat":33.5,"lng":126.5}}
            ]}"#,
        );
        let fetcher: Arc<dyn ResourceFetcher> = Arc::new(fetcher);
        let config = Config {
            use_worker: false,
            ..Default::default()
        };
        BrowseSession::start(&config, fetcher).await.unwrap()
    }

    #[tokio::test]
    async fn test_script_drives_session() {
        let mut session = session().await;
        let script: &[u8] = b"open cafes\ntoggle Cafe\nsearch blue\nbogus\n";
        run_script(&mut session, script).await.unwrap();

        assert_eq!(session.active().map(|d| d.id()), Some("cafes"));
        assert!(session.selection().is_selected(DEFAULT_CATEGORY, "Cafe"));
        assert_eq!(session.query(), "blue");
        let titles: Vec<&str> = session.visible_places().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Blue Cafe"]);
    }

    #[tokio::test]
    async fn test_script_stops_at_quit() {
        let mut session = session().await;
        let script: &[u8] = b"quit\nopen cafes\n";
        run_script(&mut session, script).await.unwrap();
        assert!(session.active().is_none());
    }
}
