use chrono::Local;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use sysmon_refresh::{GraphKind, LoadGraph, MetricsSource, PollScheduler};

use super::App;

const CPU_COLORS: [Color; 8] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::LightRed,
    Color::LightGreen,
];
const MEM_COLORS: [Color; 2] = [Color::Magenta, Color::Green];
const NET_COLORS: [Color; 2] = [Color::Blue, Color::Red];

pub fn draw<S: MetricsSource>(f: &mut Frame, app: &mut App, scheduler: &mut PollScheduler<S>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, rows[0], app, scheduler);

    if scheduler.is_visible() {
        let charts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(rows[1]);
        for (kind, area) in [GraphKind::Cpu, GraphKind::Mem, GraphKind::Net]
            .into_iter()
            .zip(charts.iter())
        {
            draw_graph(f, *area, app, scheduler.graph_mut(kind));
        }
    } else {
        let hidden = Paragraph::new("Graphs hidden, sampling continues. Press 'v' to show them.")
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(hidden, rows[1]);
    }

    let footer = Line::from(vec![
        Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" quit  "),
        Span::styled("s", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" smooth refresh  "),
        Span::styled("b", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" bits/bytes  "),
        Span::styled("+/-", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" interval  "),
        Span::styled("v", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" show/hide graphs"),
    ]);
    f.render_widget(Paragraph::new(footer), rows[2]);
}

fn draw_header<S: MetricsSource>(
    f: &mut Frame,
    area: Rect,
    app: &App,
    scheduler: &PollScheduler<S>,
) {
    let config = scheduler.config();
    let refresh = scheduler.refresh();
    let line = Line::from(vec![
        Span::styled(
            Local::now().format("%H:%M:%S").to_string(),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(format!(
            "  interval {}ms (configured {}ms)  smooth refresh {}  own CPU {}%  units {:?}",
            scheduler.interval().as_millis(),
            config.update_interval.as_millis(),
            if refresh.is_active() { "on" } else { "off" },
            refresh.last_self_cpu(),
            config.network_unit,
        )),
    ]);
    let status = Line::from(Span::styled(
        app.status.clone(),
        Style::default().fg(Color::DarkGray),
    ));
    let header = Paragraph::new(vec![line, status]).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" sysmon-refresh "),
    );
    f.render_widget(header, area);
}

fn draw_graph(f: &mut Frame, area: Rect, app: &mut App, graph: &mut LoadGraph) {
    // one caption per two rows inside the borders and the time axis
    let label_rows = u32::from(area.height.saturating_sub(3)) / 2;
    graph.set_label_rows(label_rows);

    let kind = graph.kind();
    let axes = app.axes(kind);
    if graph.take_background_stale() || axes.y.is_empty() {
        let mut y = graph.y_captions();
        // ratatui lists axis labels bottom-up
        y.reverse();
        axes.y = y;
        axes.x = graph.time_captions();
    }
    let graph: &LoadGraph = graph;

    let (title, names, colors): (String, Vec<String>, &[Color]) = match kind {
        GraphKind::Cpu => (
            " CPU History ".to_string(),
            graph
                .labels()
                .cpu
                .iter()
                .enumerate()
                .map(|(i, load)| format!("CPU{} {}", i + 1, load))
                .collect(),
            &CPU_COLORS[..],
        ),
        GraphKind::Mem => (
            " Memory and Swap History ".to_string(),
            vec![
                format!("Memory {}", graph.labels().memory),
                format!("Swap {}", graph.labels().swap),
            ],
            &MEM_COLORS[..],
        ),
        GraphKind::Net => {
            let labels = graph.labels();
            (
                " Network History ".to_string(),
                vec![
                    format!("Receiving {} (total {})", labels.net_in, labels.net_in_total),
                    format!("Sending {} (total {})", labels.net_out, labels.net_out_total),
                ],
                &NET_COLORS[..],
            )
        }
    };

    let series: Vec<Vec<(f64, f64)>> = (0..graph.data().series())
        .map(|i| points(graph, i))
        .collect();
    let datasets = series
        .iter()
        .zip(names)
        .enumerate()
        .map(|(i, (data, name))| {
            Dataset::default()
                .name(name)
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(colors[i % colors.len()]))
                .data(data)
        })
        .collect::<Vec<_>>();

    let width = graph.data().points().saturating_sub(1) as f64;
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(title, Style::default().fg(Color::Yellow))),
        )
        .x_axis(Axis::default().bounds([0.0, width]).labels(axes.x.clone()))
        .y_axis(Axis::default().bounds([0.0, 1.0]).labels(axes.y.clone()));
    f.render_widget(chart, area);
}

/// Chart points for one series, oldest on the left; empty slots are skipped.
fn points(graph: &LoadGraph, series: usize) -> Vec<(f64, f64)> {
    let last = graph.data().points().saturating_sub(1);
    graph
        .data()
        .iter()
        .filter_map(|(slot, age)| {
            let value = *slot.get(series)?;
            (value >= 0.0).then(|| ((last - age) as f64, f64::from(value)))
        })
        .collect()
}
