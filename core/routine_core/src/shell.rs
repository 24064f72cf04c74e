//! Line-oriented front end: dashboard, daily checklist and analytics views,
//! plus the commands that mutate the logs.

use crate::{
    analytics::{self, MONTH, WEEK},
    catalog::Category,
    date_key::{Clock, DateKey, DateKeyError},
    export::{write_backup, ExportDocument},
    store::{KeyValueStore, WriteStatus},
    summarizer::{
        performance_prompt, reflection_prompt, summarize, Summarizer, SummaryOutcome,
        REFLECTION_FALLBACK, REVIEW_FALLBACK,
    },
    tracker::Tracker,
};
use std::{
    future::Future,
    io::{self, Write},
    path::PathBuf,
    str::FromStr,
};
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};
use tracing::{debug, info};

const HELP: &str = "\
commands:
  dashboard | d        progress, streak, next task, weekly trend, cycle efficiency
  daily | l            checklist for the selected date
  analytics | a        AI review, summary and 30-day heatmap
  toggle <id> | t <id> mark a task done / not done on the selected date
  prev | next | today  move the selected date
  date <YYYY-MM-DD>    jump to a date (not in the future)
  reflect              save an AI summary of the selected day
  review               ask for an AI performance review
  export               write a JSON backup
  help | quit";

const INSIGHT_PLACEHOLDER: &str = "Log your day and generate an AI insight here!";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Dashboard,
    Daily,
    Analytics,
    Toggle(String),
    Prev,
    Next,
    Today,
    Date(DateKey),
    Reflect,
    Review,
    Export,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}' (type `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArg(&'static str),
    #[error(transparent)]
    BadDate(#[from] DateKeyError),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let head = parts.next().unwrap_or("").to_lowercase();
        let arg = parts.next();
        let cmd = match head.as_str() {
            "dashboard" | "d" => Command::Dashboard,
            "daily" | "list" | "l" => Command::Daily,
            "analytics" | "a" => Command::Analytics,
            "toggle" | "t" => {
                Command::Toggle(arg.ok_or(CommandError::MissingArg("toggle"))?.to_string())
            }
            "prev" | "p" => Command::Prev,
            "next" | "n" => Command::Next,
            "today" => Command::Today,
            "date" => {
                Command::Date(DateKey::parse(arg.ok_or(CommandError::MissingArg("date"))?)?)
            }
            "reflect" => Command::Reflect,
            "review" => Command::Review,
            "export" => Command::Export,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => return Err(CommandError::Unknown(head)),
        };
        Ok(cmd)
    }
}

/// A summarizer call that has come back.
#[derive(Debug)]
enum Finished {
    Reflection { date: DateKey, outcome: SummaryOutcome },
    Review { outcome: SummaryOutcome },
}

enum Event {
    Line(Option<String>),
    Finished(Finished),
    Shutdown,
}

pub struct Shell<S: KeyValueStore, Z, C: Clock> {
    tracker: Tracker<S>,
    summarizer: Z,
    clock: C,
    export_dir: PathBuf,
    selected: DateKey,
    insight: Option<String>,
    reflecting: bool,
    reviewing: bool,
    pending: usize,
    tx: mpsc::UnboundedSender<Finished>,
    rx: mpsc::UnboundedReceiver<Finished>,
}

impl<S, Z, C> Shell<S, Z, C>
where
    S: KeyValueStore,
    Z: Summarizer + Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn new(tracker: Tracker<S>, summarizer: Z, clock: C, export_dir: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let selected = DateKey::today(&clock);
        Self {
            tracker,
            summarizer,
            clock,
            export_dir,
            selected,
            insight: None,
            reflecting: false,
            reviewing: false,
            pending: 0,
            tx,
            rx,
        }
    }

    pub fn tracker(&self) -> &Tracker<S> {
        &self.tracker
    }

    pub fn selected(&self) -> DateKey {
        self.selected
    }

    pub fn insight(&self) -> Option<&str> {
        self.insight.as_deref()
    }

    fn today(&self) -> DateKey {
        DateKey::today(&self.clock)
    }

    /// Runs until `quit`, end of input or `shutdown`, then waits for
    /// in-flight summaries so their results are persisted.
    pub async fn run<R, W, F>(&mut self, input: R, out: &mut W, shutdown: F) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        F: Future<Output = ()>,
    {
        let mut lines = input.lines();
        tokio::pin!(shutdown);

        self.render_dashboard(out)?;
        prompt(out)?;
        loop {
            // Input first: replies are applied whenever the user is idle.
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => Event::Shutdown,
                line = lines.next_line() => Event::Line(line?),
                Some(done) = self.rx.recv() => Event::Finished(done),
            };
            match event {
                Event::Line(None) | Event::Shutdown => break,
                Event::Line(Some(line)) => {
                    if !self.handle_line(&line, out)? {
                        break;
                    }
                    prompt(out)?;
                }
                Event::Finished(done) => self.finish(done, out)?,
            }
        }

        if self.pending > 0 {
            writeln!(out, "waiting for {} pending request(s)...", self.pending)?;
        }
        while self.pending > 0 {
            match self.rx.recv().await {
                Some(done) => self.finish(done, out)?,
                None => break,
            }
        }
        info!("shell closed");
        Ok(())
    }

    /// Returns `false` when the user asked to quit.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<bool> {
        if line.trim().is_empty() {
            return Ok(true);
        }
        let cmd = match line.parse::<Command>() {
            Ok(c) => c,
            Err(err) => {
                writeln!(out, "{err}")?;
                return Ok(true);
            }
        };
        debug!("command {cmd:?}");

        match cmd {
            Command::Dashboard => self.render_dashboard(out)?,
            Command::Daily => self.render_daily(out)?,
            Command::Analytics => self.render_analytics(out)?,
            Command::Toggle(id) => self.toggle(&id, out)?,
            Command::Prev => match self.selected.pred() {
                Some(d) => self.select(d, out)?,
                None => writeln!(out, "no earlier date")?,
            },
            Command::Next => {
                if self.selected >= self.today() {
                    writeln!(out, "already at today")?;
                } else if let Some(d) = self.selected.succ() {
                    self.select(d, out)?;
                }
            }
            Command::Today => {
                let today = self.today();
                self.select(today, out)?;
            }
            Command::Date(d) => {
                if d > self.today() {
                    writeln!(out, "{d} is in the future")?;
                } else {
                    self.select(d, out)?;
                }
            }
            Command::Reflect => self.start_reflection(out)?,
            Command::Review => self.start_review(out)?,
            Command::Export => self.export(out)?,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn select<W: Write>(&mut self, date: DateKey, out: &mut W) -> io::Result<()> {
        self.selected = date;
        self.render_daily(out)
    }

    fn toggle<W: Write>(&mut self, id: &str, out: &mut W) -> io::Result<()> {
        let Some(item) = self.tracker.catalog().get(id).cloned() else {
            writeln!(out, "no task with id '{id}' (see `daily`)")?;
            return Ok(());
        };
        let outcome = self.tracker.toggle(self.selected, id);
        let mark = if outcome.completed { "✓" } else { "○" };
        let progress =
            analytics::day_progress(self.tracker.catalog(), self.tracker.history(), self.selected);
        writeln!(
            out,
            "{mark} {} {} {}  ({}%, {} logged, {} left)",
            item.time,
            item.emoji,
            item.activity,
            progress.percent,
            progress.done,
            progress.remaining
        )?;
        write_notice(&outcome.write, out)?;
        if progress.percent == 100 && self.tracker.reflection(self.selected).is_none() {
            writeln!(out, "Day fully completed! Type `reflect` to save your daily achievement.")?;
        }
        Ok(())
    }

    fn start_reflection<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.reflecting {
            writeln!(out, "a reflection is already being logged")?;
            return Ok(());
        }
        let completed = self.tracker.completed(self.selected);
        if completed.is_empty() {
            writeln!(out, "nothing completed on {} yet", self.selected)?;
            return Ok(());
        }
        let prompt = reflection_prompt(self.tracker.catalog(), &completed);
        let date = self.selected;
        self.reflecting = true;
        self.spawn_summary(prompt, move |outcome| Finished::Reflection { date, outcome });
        writeln!(out, "Logging...")
    }

    fn start_review<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.reviewing {
            writeln!(out, "a review is already running")?;
            return Ok(());
        }
        let catalog = self.tracker.catalog();
        let summary = analytics::summary(catalog, self.tracker.history(), self.today());
        let done = analytics::day_progress(catalog, self.tracker.history(), self.selected).done;
        let prompt = performance_prompt(&summary, done, catalog.len());
        self.reviewing = true;
        self.spawn_summary(prompt, |outcome| Finished::Review { outcome });
        writeln!(out, "Analyzing...")
    }

    fn spawn_summary<F>(&mut self, prompt: String, finished: F)
    where
        F: FnOnce(SummaryOutcome) -> Finished + Send + 'static,
    {
        let z = self.summarizer.clone();
        let tx = self.tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            let outcome = summarize(&z, &prompt).await;
            // The receiver lives as long as the shell.
            let _ = tx.send(finished(outcome));
        });
    }

    fn finish<W: Write>(&mut self, done: Finished, out: &mut W) -> io::Result<()> {
        self.pending = self.pending.saturating_sub(1);
        match done {
            Finished::Reflection { date, outcome } => {
                self.reflecting = false;
                let text = outcome.or_fallback(REFLECTION_FALLBACK);
                let status = self.tracker.save_reflection(date, text.clone());
                writeln!(out, "\nReflection saved for {date}: {text}")?;
                write_notice(&status, out)?;
            }
            Finished::Review { outcome } => {
                self.reviewing = false;
                let text = outcome.or_fallback(REVIEW_FALLBACK);
                writeln!(out, "\nAI performance review: {text}")?;
                self.insight = Some(text);
            }
        }
        Ok(())
    }

    fn export<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let now = self.clock.now();
        let today = DateKey::from_local(now.naive_local());
        let doc = ExportDocument::build(
            self.tracker.catalog(),
            self.tracker.history(),
            self.tracker.reflections(),
            now,
        );
        match write_backup(&self.export_dir, today, &doc) {
            Ok(path) => writeln!(out, "exported to {}", path.display()),
            Err(err) => writeln!(out, "export failed: {err}"),
        }
    }

    fn render_dashboard<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let catalog = self.tracker.catalog();
        let history = self.tracker.history();
        let now = self.clock.now().naive_local();
        let today = DateKey::from_local(now);
        let label = if self.selected == today { "Live Today" } else { "Selected Date" };

        writeln!(out, "== Command Center ({label}: {}) ==", self.selected)?;
        writeln!(
            out,
            "Progress {}%   Streak {} day(s)",
            analytics::completion_percent(catalog, history, self.selected),
            analytics::streak(catalog, history, today)
        )?;
        if let Some(next) = analytics::next_upcoming_task(catalog, history, self.selected, now) {
            writeln!(
                out,
                "Next up: {} {} {} (id {})",
                next.time, next.emoji, next.activity, next.id
            )?;
        }

        writeln!(out, "Weekly trend")?;
        for day in analytics::rolling_window(catalog, history, today, WEEK) {
            writeln!(
                out,
                "  {} {} {:>3}%",
                day.date.weekday_label(),
                bar(day.percent),
                day.percent
            )?;
        }

        writeln!(out, "Cycle efficiency")?;
        for stat in analytics::category_efficiency(catalog, history, self.selected) {
            writeln!(
                out,
                "  {:<9} {} {:>3}% ({}/{})",
                stat.category.as_str(),
                bar(stat.percent),
                stat.percent,
                stat.done,
                stat.total
            )?;
        }
        Ok(())
    }

    fn render_daily<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let catalog = self.tracker.catalog();
        let history = self.tracker.history();
        let label = if self.selected == self.today() { "Today" } else { "Archive" };
        let progress = analytics::day_progress(catalog, history, self.selected);

        writeln!(out, "== {label}: {} ==", self.selected.date().format("%b %-d, %Y"))?;
        writeln!(
            out,
            "Success score {}%  ({} logged, {} left)",
            progress.percent, progress.done, progress.remaining
        )?;
        match self.tracker.reflection(self.selected) {
            Some(text) => writeln!(out, "Reflection: {text}")?,
            None if self.reflecting => writeln!(out, "Logging reflection...")?,
            None if progress.percent == 100 => {
                writeln!(
                    out,
                    "Day fully completed! Type `reflect` to save your daily achievement."
                )?
            }
            None => {}
        }

        for category in Category::ALL {
            writeln!(out, "{category} schedule")?;
            for item in catalog.in_category(category) {
                let mark = if history.is_done(self.selected, &item.id) { "x" } else { " " };
                writeln!(
                    out,
                    "  [{mark}] {:>2}  {:>8}  {} {}",
                    item.id, item.time.to_string(), item.emoji, item.activity
                )?;
            }
        }
        Ok(())
    }

    fn render_analytics<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let catalog = self.tracker.catalog();
        let history = self.tracker.history();
        let today = self.today();
        let summary = analytics::summary(catalog, history, today);

        writeln!(out, "== Analytics ==")?;
        let insight = if self.reviewing {
            "Analyzing..."
        } else {
            self.insight.as_deref().unwrap_or(INSIGHT_PLACEHOLDER)
        };
        writeln!(out, "AI performance review: {insight}")?;
        writeln!(
            out,
            "Average {}%   Streak {}   Tasks done {}   Best day {}",
            summary.average_completion,
            summary.streak,
            summary.total_tasks_done,
            summary
                .best_day
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        )?;

        writeln!(out, "Last 30 days")?;
        let days = analytics::rolling_window(catalog, history, today, MONTH);
        for row in days.chunks(7) {
            let cells: Vec<String> = row
                .iter()
                .map(|d| format!("{:>2}{}", d.date.day_of_month(), shade(d.percent)))
                .collect();
            writeln!(out, "  {}", cells.join(" "))?;
        }
        Ok(())
    }
}

fn prompt<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "> ")?;
    out.flush()
}

fn write_notice<W: Write>(status: &WriteStatus, out: &mut W) -> io::Result<()> {
    if let WriteStatus::Failed { error } = status {
        writeln!(out, "warning: not saved to disk ({error}); kept in memory")?;
    }
    Ok(())
}

fn bar(percent: u8) -> String {
    let filled = (percent as usize + 5) / 10;
    format!("{}{}", "#".repeat(filled), ".".repeat(10 - filled))
}

fn shade(percent: u8) -> char {
    match percent {
        0 => '.',
        1..=33 => '░',
        34..=66 => '▒',
        67..=99 => '▓',
        _ => '█',
    }
}
