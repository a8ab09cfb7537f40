use std::{fmt, sync::Arc, time::Duration};

use chrono::Local;
use iced::{
    Alignment, Border, Color, Element, Length, Shadow, Task, Theme, Vector,
    futures::{SinkExt, channel::mpsc},
    widget::{
        Space, button,
        canvas::{Cache, Canvas},
        checkbox, column, container, pick_list, progress_bar, row, scrollable, stack, text,
        text_input,
    },
};
use rms_dashboard::{
    AnalysisType, AnalyticsClient, AnalyticsPanel, FetchEvent, FetchTask, PanelError,
    PanelResult,
    config::AppConfig,
    export, style,
    widgets::bar_chart::BarChartWidget,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Checking,
    Online,
    Offline,
}

/// Outlet selector entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutletChoice {
    All,
    Outlet(String),
}

impl fmt::Display for OutletChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutletChoice::All => f.write_str("All Outlets"),
            OutletChoice::Outlet(id) => f.write_str(id),
        }
    }
}

/// A panel plus the canvas caches of its charts.
struct PanelSlot {
    panel: AnalyticsPanel,
    chart_caches: Vec<(Cache, Cache)>,
}

impl PanelSlot {
    fn new(panel: AnalyticsPanel) -> Self {
        let charts = panel.analysis().descriptor().charts.len();
        Self {
            panel,
            chart_caches: (0..charts).map(|_| (Cache::new(), Cache::new())).collect(),
        }
    }

    fn clear_caches(&self) {
        for (chart, tooltip) in &self.chart_caches {
            chart.clear();
            tooltip.clear();
        }
    }
}

pub struct DashboardApp {
    config: Arc<AppConfig>,
    client: AnalyticsClient,
    slots: Vec<PanelSlot>,
    current: AnalysisType,
    backend: BackendStatus,
    toast: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Message {
    // Navigation
    SwitchPanel(AnalysisType),

    // Filters
    StartDateChanged(AnalysisType, String),
    EndDateChanged(AnalysisType, String),
    OutletSelected(AnalysisType, OutletChoice),
    FiltersToggled(AnalysisType, bool),

    // Analysis workflow
    RunAnalysis(AnalysisType),
    Fetch(AnalysisType, FetchEvent),
    DismissError(AnalysisType),

    // Backend connectivity
    CheckBackend,
    BackendChecked(bool),

    // Export
    ExportCsv(AnalysisType),
    ExportCompleted(Result<String, String>),
    ClearToast,
}

impl DashboardApp {
    pub fn new(config: Arc<AppConfig>, client: AnalyticsClient) -> (Self, Task<Message>) {
        let today = Local::now().date_naive();
        let slots = AnalysisType::ALL
            .into_iter()
            .map(|analysis| {
                PanelSlot::new(AnalyticsPanel::new(
                    analysis,
                    today,
                    config.filters.default_lookback_days,
                    config.filters.use_filters,
                ))
            })
            .collect();

        let app = Self {
            config,
            client: client.clone(),
            slots,
            current: AnalysisType::PeakDining,
            backend: BackendStatus::Checking,
            toast: None,
        };

        (app, Self::check_backend(client))
    }

    fn check_backend(client: AnalyticsClient) -> Task<Message> {
        Task::perform(
            async move { client.check_health().await },
            Message::BackendChecked,
        )
    }

    fn slot(&self, analysis: AnalysisType) -> &PanelSlot {
        let index = AnalysisType::ALL
            .iter()
            .position(|a| *a == analysis)
            .unwrap_or(0);
        &self.slots[index]
    }

    fn slot_mut(&mut self, analysis: AnalysisType) -> &mut PanelSlot {
        let index = AnalysisType::ALL
            .iter()
            .position(|a| *a == analysis)
            .unwrap_or(0);
        &mut self.slots[index]
    }

    pub fn title(&self) -> String {
        format!("{} - {}", self.config.window.title, self.current.title())
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SwitchPanel(analysis) => {
                self.current = analysis;
                Task::none()
            }
            Message::StartDateChanged(analysis, value) => {
                self.slot_mut(analysis).panel.start_date = value;
                Task::none()
            }
            Message::EndDateChanged(analysis, value) => {
                self.slot_mut(analysis).panel.end_date = value;
                Task::none()
            }
            Message::OutletSelected(analysis, choice) => {
                self.slot_mut(analysis).panel.outlet = match choice {
                    OutletChoice::All => None,
                    OutletChoice::Outlet(id) => Some(id),
                };
                Task::none()
            }
            Message::FiltersToggled(analysis, enabled) => {
                self.slot_mut(analysis).panel.use_filters = enabled;
                Task::none()
            }
            Message::RunAnalysis(analysis) => {
                let client = self.client.clone();
                match self.slot_mut(analysis).panel.trigger() {
                    Ok(filters) => {
                        let stream = iced::stream::channel(
                            16,
                            move |mut output: mpsc::Sender<FetchEvent>| async move {
                                let mut handle = FetchTask::spawn(client, analysis.key(), filters);
                                while let Some(event) = handle.next_event().await {
                                    if output.send(event).await.is_err() {
                                        break;
                                    }
                                }
                            },
                        );
                        Task::run(stream, move |event| Message::Fetch(analysis, event))
                    }
                    Err(PanelError::Busy) => Task::none(),
                    Err(e) => {
                        tracing::warn!(%analysis, error = %e, "Analysis not started");
                        Task::none()
                    }
                }
            }
            Message::Fetch(analysis, event) => {
                let finished = matches!(event, FetchEvent::Finished(_));
                let slot = self.slot_mut(analysis);
                slot.panel.apply(event);
                if finished {
                    slot.clear_caches();
                }
                Task::none()
            }
            Message::DismissError(analysis) => {
                self.slot_mut(analysis).panel.clear_error();
                Task::none()
            }
            Message::CheckBackend => {
                self.backend = BackendStatus::Checking;
                Self::check_backend(self.client.clone())
            }
            Message::BackendChecked(healthy) => {
                self.backend = if healthy {
                    BackendStatus::Online
                } else {
                    tracing::warn!(root = self.client.root(), "Analytics backend unreachable");
                    BackendStatus::Offline
                };
                Task::none()
            }
            Message::ExportCsv(analysis) => {
                let Some(result) = self.slot(analysis).panel.result() else {
                    return Task::none();
                };
                let rows = result.table.clone();
                let dir = self.config.export.directory.clone();
                self.toast = Some("Exporting...".to_string());
                Task::perform(export::export_table(dir, analysis, rows), |r| {
                    Message::ExportCompleted(
                        r.map(|path| path.display().to_string())
                            .map_err(|e| format!("{:#}", e)),
                    )
                })
            }
            Message::ExportCompleted(result) => {
                self.toast = Some(match result {
                    Ok(path) => format!("Saved to {}", path),
                    Err(e) => {
                        tracing::warn!(error = %e, "Export failed");
                        format!("Export failed: {}", e)
                    }
                });
                Task::perform(
                    async {
                        tokio::time::sleep(Duration::from_secs(4)).await;
                    },
                    |_| Message::ClearToast,
                )
            }
            Message::ClearToast => {
                self.toast = None;
                Task::none()
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let main_area = container(
            scrollable(column![
                self.view_header(),
                Space::new().height(20),
                self.view_panel(self.slot(self.current))
            ])
            .height(Length::Fill),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(30);

        let app_layout = row![self.view_sidebar(), main_area]
            .width(Length::Fill)
            .height(Length::Fill);

        if let Some(msg) = &self.toast {
            let toast = container(text(msg).size(14).color(style::TEXT_BRIGHT))
                .padding([12, 24])
                .style(|_| container::Style {
                    background: Some(style::BG_CARD.into()),
                    border: Border {
                        radius: 20.0.into(),
                        width: 1.0,
                        color: style::ACCENT_GREEN,
                    },
                    shadow: Shadow {
                        color: Color::from_rgba(0.0, 0.0, 0.0, 0.5),
                        offset: Vector::new(0.0, 4.0),
                        blur_radius: 10.0,
                    },
                    ..Default::default()
                });
            stack![
                app_layout,
                container(toast)
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .align_x(Alignment::Center)
                    .padding(30)
            ]
            .into()
        } else {
            app_layout.into()
        }
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    // --- VIEW COMPONENTS ---

    fn view_sidebar(&self) -> Element<'_, Message> {
        let sidebar_width = self.config.window.sidebar_width;

        let brand = column![
            text("RMS")
                .size(32)
                .font(iced::font::Font::MONOSPACE)
                .color(style::ACCENT_ORANGE),
            text("ANALYTICS").size(14).color(style::TEXT_MUTED),
        ];

        let nav_btn = |analysis: AnalysisType| {
            let is_active = self.current == analysis;
            let running = self.slot(analysis).panel.is_running();
            let bg = if is_active {
                style::ACCENT_BLUE
            } else {
                Color::TRANSPARENT
            };
            let txt = if is_active {
                style::BG_DARK
            } else {
                style::TEXT_MUTED
            };
            let label = if running {
                format!("{} ...", nav_label(analysis))
            } else {
                nav_label(analysis).to_string()
            };
            button(text(label).color(txt).size(15))
                .on_press(Message::SwitchPanel(analysis))
                .style(move |_, _| button::Style {
                    background: Some(bg.into()),
                    border: Border {
                        radius: 8.0.into(),
                        ..Default::default()
                    },
                    text_color: txt,
                    ..Default::default()
                })
                .width(Length::Fill)
                .padding(12)
        };

        let mut nav = column![brand, Space::new().height(40)].spacing(8);
        for analysis in AnalysisType::ALL {
            nav = nav.push(nav_btn(analysis));
        }

        container(nav)
            .width(Length::Fixed(sidebar_width))
            .height(Length::Fill)
            .style(|_| container::Style {
                background: Some(style::BG_CARD.into()),
                border: Border {
                    color: style::STROKE_DIM,
                    width: 1.0,
                    ..Default::default()
                },
                ..Default::default()
            })
            .padding(20)
            .into()
    }

    fn view_header(&self) -> Element<'_, Message> {
        let (dot, label) = match self.backend {
            BackendStatus::Checking => (style::TEXT_MUTED, "Checking backend..."),
            BackendStatus::Online => (style::ACCENT_GREEN, "Backend connected"),
            BackendStatus::Offline => (style::ACCENT_RED, "Backend unreachable"),
        };

        let status = row![
            container(Space::new().width(8).height(8)).style(move |_| container::Style {
                background: Some(dot.into()),
                border: Border {
                    radius: 4.0.into(),
                    ..Default::default()
                },
                ..Default::default()
            }),
            column![
                text(label).size(14).color(style::TEXT_MUTED),
                text(self.client.root().to_string())
                    .size(11)
                    .color(style::TEXT_MUTED),
            ]
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        row![
            text(self.current.title())
                .size(28)
                .color(style::TEXT_BRIGHT),
            Space::new().width(Length::Fill),
            status,
            Space::new().width(10),
            button(text("↻").size(18))
                .on_press_maybe(
                    (self.backend != BackendStatus::Checking).then_some(Message::CheckBackend)
                )
                .padding(10)
                .style(secondary_btn_style)
        ]
        .align_y(Alignment::Center)
        .into()
    }

    fn view_panel<'a>(&'a self, slot: &'a PanelSlot) -> Element<'a, Message> {
        let panel = &slot.panel;
        let analysis = panel.analysis();

        let mut outlets = vec![OutletChoice::All];
        outlets.extend(
            self.config
                .filters
                .outlets
                .iter()
                .cloned()
                .map(OutletChoice::Outlet),
        );
        let selected = match &panel.outlet {
            Some(id) => OutletChoice::Outlet(id.clone()),
            None => OutletChoice::All,
        };

        let filters_on = panel.use_filters;
        let controls = row![
            text("Start").size(12).color(style::TEXT_MUTED),
            styled_input(&panel.start_date, move |v| Message::StartDateChanged(analysis, v)),
            text("End").size(12).color(style::TEXT_MUTED),
            styled_input(&panel.end_date, move |v| Message::EndDateChanged(analysis, v)),
            Space::new().width(10),
            text("Outlet").size(12).color(style::TEXT_MUTED),
            pick_list(outlets, Some(selected), move |choice| {
                Message::OutletSelected(analysis, choice)
            })
            .text_size(12)
            .padding(8),
            Space::new().width(10),
            checkbox(filters_on)
                .on_toggle(move |on| Message::FiltersToggled(analysis, on))
                .size(14),
            text("Apply filters").size(12).color(if filters_on {
                style::TEXT_BRIGHT
            } else {
                style::TEXT_MUTED
            }),
            Space::new().width(Length::Fill),
            button(text("Run Analysis").size(12))
                .on_press_maybe(panel.can_trigger().then_some(Message::RunAnalysis(analysis)))
                .padding([8, 14])
                .style(primary_btn_style),
            button(text("Export CSV").size(12))
                .on_press_maybe(
                    panel
                        .result()
                        .is_some()
                        .then_some(Message::ExportCsv(analysis))
                )
                .padding([8, 14])
                .style(secondary_btn_style),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let mut content = column![card_container(controls)].spacing(20);

        if panel.is_running() {
            let status = match panel.progress() {
                Some(p) => format!("Running analysis... {}%", p),
                None => "Starting analysis...".to_string(),
            };
            content = content.push(card_container(
                column![
                    text(status).size(13).color(style::TEXT_MUTED),
                    progress_bar(0.0..=100.0, f32::from(panel.progress().unwrap_or(0))),
                ]
                .spacing(8),
            ));
        }

        if let Some(error) = panel.error() {
            content = content.push(error_banner(error, analysis));
        }

        match panel.result() {
            Some(result) => {
                content = content.push(self.view_result(slot, result));
            }
            None if !panel.is_running() && panel.error().is_none() => {
                content = content.push(card_container(
                    text("Choose filters and press Run Analysis.")
                        .size(14)
                        .color(style::TEXT_MUTED),
                ));
            }
            None => {}
        }

        content.into()
    }

    fn view_result<'a>(&'a self, slot: &'a PanelSlot, result: &'a PanelResult) -> Element<'a, Message> {
        let mut sections = column![].spacing(20);

        if !result.summary.is_empty() {
            let mut lines = column![].spacing(6);
            for line in &result.summary {
                lines = lines.push(
                    row![
                        text(format!("{}:", line.label))
                            .size(14)
                            .color(style::TEXT_MUTED),
                        text(line.value.as_str()).size(14).color(style::ACCENT_CYAN),
                    ]
                    .spacing(8),
                );
            }
            sections = sections.push(card_container(lines));
        }

        for (chart, (cache, tooltip_cache)) in result.charts.iter().zip(&slot.chart_caches) {
            let canvas = Canvas::new(BarChartWidget {
                chart,
                cache,
                tooltip_cache,
            })
            .width(Length::Fill)
            .height(Length::Fixed(260.0));

            sections = sections.push(card_container(canvas));
        }

        let mut table = column![
            row![
                text("Metric").size(13).color(style::TEXT_BRIGHT).width(Length::FillPortion(2)),
                text("Value").size(13).color(style::TEXT_BRIGHT).width(Length::FillPortion(1)),
            ]
        ]
        .spacing(4);
        if result.table.is_empty() {
            table = table.push(text("No data returned").size(12).color(style::TEXT_MUTED));
        }
        for (label, value) in &result.table {
            table = table.push(row![
                text(label.as_str())
                    .size(12)
                    .color(style::TEXT_MUTED)
                    .width(Length::FillPortion(2)),
                text(value.as_str())
                    .size(12)
                    .color(style::TEXT_BRIGHT)
                    .width(Length::FillPortion(1)),
            ]);
        }
        sections = sections.push(card_container(table));

        sections.into()
    }
}

fn nav_label(analysis: AnalysisType) -> &'static str {
    match analysis {
        AnalysisType::PeakDining => "Peak Dining",
        AnalysisType::CustomerSegmentation => "Customers",
        AnalysisType::RevenueAnalysis => "Revenue",
        AnalysisType::MenuAnalysis => "Menu Items",
        AnalysisType::SeasonalBehavior => "Seasonal",
        AnalysisType::AnomalyDetection => "Anomalies",
        AnalysisType::BranchPerformance => "Branches",
    }
}

fn error_banner(message: &str, analysis: AnalysisType) -> Element<'_, Message> {
    container(
        row![
            container(text("!").size(12).color(style::BG_DARK))
                .padding([2, 6])
                .style(|_| container::Style {
                    background: Some(style::ACCENT_RED.into()),
                    border: Border {
                        radius: 10.0.into(),
                        ..Default::default()
                    },
                    ..Default::default()
                }),
            text(message).size(14).color(style::ACCENT_RED),
            Space::new().width(Length::Fill),
            button(text("Dismiss").size(12))
                .on_press(Message::DismissError(analysis))
                .padding([6, 12])
                .style(secondary_btn_style),
        ]
        .spacing(8)
        .align_y(Alignment::Center),
    )
    .padding(16)
    .style(|_| container::Style {
        background: Some(style::BG_CARD.into()),
        border: Border {
            radius: 12.0.into(),
            width: 1.0,
            color: style::ACCENT_RED,
        },
        ..Default::default()
    })
    .into()
}

fn card_container<'a>(
    content: impl Into<Element<'a, Message>>,
) -> container::Container<'a, Message> {
    container(content)
        .padding(24)
        .width(Length::Fill)
        .style(|_| container::Style {
            background: Some(style::BG_CARD.into()),
            border: Border {
                color: Color::TRANSPARENT,
                width: 0.0,
                radius: 16.0.into(),
            },
            shadow: Shadow {
                color: Color::from_rgba(0.0, 0.0, 0.0, 0.3),
                offset: Vector::new(0.0, 4.0),
                blur_radius: 10.0,
            },
            ..Default::default()
        })
}

fn styled_input(
    val: &str,
    on_change: impl Fn(String) -> Message + 'static,
) -> Element<'_, Message> {
    text_input("YYYY-MM-DD", val)
        .on_input(on_change)
        .padding(8)
        .width(Length::Fixed(110.0))
        .size(12)
        .style(|_, status| {
            let border_color = if matches!(status, iced::widget::text_input::Status::Focused { .. })
            {
                style::ACCENT_BLUE
            } else {
                style::STROKE_DIM
            };
            text_input::Style {
                background: style::BG_DARK.into(),
                border: Border {
                    color: border_color,
                    width: 1.0,
                    radius: 6.0.into(),
                },
                icon: style::TEXT_MUTED,
                placeholder: style::TEXT_MUTED,
                value: style::TEXT_BRIGHT,
                selection: style::ACCENT_BLUE,
            }
        })
        .into()
}

fn primary_btn_style(_: &Theme, status: button::Status) -> button::Style {
    let disabled = matches!(status, button::Status::Disabled);
    button::Style {
        background: Some(if disabled {
            style::STROKE_DIM.into()
        } else {
            style::ACCENT_BLUE.into()
        }),
        text_color: if disabled {
            style::TEXT_MUTED
        } else {
            style::BG_DARK
        },
        border: Border {
            radius: 6.0.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn secondary_btn_style(_: &Theme, status: button::Status) -> button::Style {
    button::Style {
        background: Some(style::BG_DARK.into()),
        text_color: if matches!(status, button::Status::Disabled) {
            style::TEXT_MUTED
        } else {
            style::TEXT_BRIGHT
        },
        border: Border {
            radius: 6.0.into(),
            color: style::STROKE_DIM,
            width: 1.0,
        },
        ..Default::default()
    }
}
