// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crm_app::{ChipColor, Record, Rendered};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};

use crate::detail::{DetailView, FieldDisplay, TabState};
use crate::dialogs::{AssignUserDialog, ColumnDialog, FilterBuilder, FilterInput, RowMenu};
use crate::table::{TableInput, TableView};

/// Column widths are tracked in pixels; one terminal cell stands in for
/// this many.
pub const PIXELS_PER_CELL: u16 = 8;
const SELECT_COLUMN_WIDTH: u16 = 3;

pub fn chip_color(color: ChipColor) -> Color {
    match color {
        ChipColor::Neutral => Color::Gray,
        ChipColor::Primary => Color::Blue,
        ChipColor::Success => Color::Green,
        ChipColor::Warning => Color::Yellow,
        ChipColor::Error => Color::Red,
        ChipColor::Info => Color::Cyan,
    }
}

pub fn cell_style(rendered: &Rendered) -> Style {
    match rendered {
        Rendered::Placeholder | Rendered::Check(None) => Style::default().fg(Color::DarkGray),
        Rendered::Chip(chip) => Style::default()
            .fg(chip_color(chip.color))
            .add_modifier(Modifier::BOLD),
        Rendered::Link { .. } => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::UNDERLINED),
        Rendered::Action(_) => Style::default().fg(Color::Cyan),
        Rendered::Text(_) | Rendered::Check(Some(_)) | Rendered::Truncated { .. } => Style::default(),
    }
}

pub fn width_cells(pixels: u16) -> u16 {
    (pixels / PIXELS_PER_CELL).max(1)
}

pub fn filter_chips_text(labels: &[String]) -> String {
    labels
        .iter()
        .map(|label| format!("[{label}]"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_table<R: Record>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    table: &TableView<R>,
    input: TableInput<'_, R>,
    focused: bool,
) {
    let projection = table.project(input);
    let mut visible = table.visible_columns();
    if visible.is_empty() {
        visible = (0..table.columns().len()).collect();
    }

    let mut widths = vec![Constraint::Length(SELECT_COLUMN_WIDTH)];
    widths.extend(
        visible
            .iter()
            .map(|index| Constraint::Length(width_cells(table.width(*index)))),
    );

    let mut header_cells = vec![Cell::from(projection.header.glyph())];
    header_cells.extend(visible.iter().map(|index| {
        Cell::from(table.header_label(*index)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let header = Row::new(header_cells);

    let rows = projection.rows.iter().enumerate().map(|(row_index, row)| {
        let cursor_row = focused && row_index == table.cursor_row();
        let selected = row
            .record_id(table.id_field())
            .is_some_and(|id| input.selection.contains(&id));
        let mut cells = vec![Cell::from(if selected { "[x]" } else { "[ ]" })];
        cells.extend(visible.iter().copied().map(|column_index| {
            let rendered = table.render_cell(row, column_index);
            let mut style = cell_style(&rendered);
            if cursor_row {
                style = style.bg(Color::DarkGray);
            }
            if cursor_row && column_index == table.cursor_col() {
                style = Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD);
            }
            Cell::from(rendered.display_text()).style(style)
        }));
        Row::new(cells)
    });

    let chips = table.active_filter_labels();
    let layout = if chips.is_empty() {
        vec![area]
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(area)
            .to_vec()
    };
    if let [chip_area, _] = layout.as_slice() {
        let line = Paragraph::new(filter_chips_text(&chips)).style(Style::default().fg(Color::Yellow));
        frame.render_widget(line, *chip_area);
    }
    let table_area = layout.last().copied().unwrap_or(area);

    let empty = projection.is_empty();
    let widget = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table.title_text(&projection, input.selection))
                .borders(Borders::ALL),
        );
    frame.render_widget(widget, table_area);

    if empty {
        let inner = centered_rect(40, 20, table_area);
        let message = Paragraph::new("no matching rows").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(message, inner);
    }
}

/// One `label: value` line per main field, marking the field cursor.
pub fn detail_field_lines<R: Record>(detail: &DetailView<R>, edit_buffer: Option<&str>) -> Vec<String> {
    detail
        .fields()
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let cursor = index == detail.field_cursor();
            let marker = if cursor { ">" } else { " " };
            let value = match (detail.is_editing(), edit_buffer) {
                (true, Some(buffer)) if cursor => format!("{buffer}_"),
                (true, _) => {
                    let text = detail.input_text(index);
                    if field.read_only {
                        format!("{text} (read-only)")
                    } else {
                        text
                    }
                }
                (false, _) => detail.display_value(index).text(),
            };
            format!("{marker} {}: {value}", field.display_label())
        })
        .collect()
}

pub fn tab_title(label: &str, state: &TabState) -> String {
    if state.loading {
        format!("{label} …")
    } else if state.error.is_some() {
        format!("{label} !")
    } else if let Some(data) = &state.data {
        format!("{label} ({})", data.len())
    } else {
        label.to_owned()
    }
}

pub fn render_detail<R: Record>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    detail: &DetailView<R>,
    edit_buffer: Option<&str>,
) {
    let field_height = u16::try_from(detail.fields().len())
        .unwrap_or(u16::MAX)
        .saturating_add(2);
    let error_height = if detail.error().is_some() { 3 } else { 0 };
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(error_height),
            Constraint::Length(field_height),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    if let Some(error) = detail.error() {
        let alert = Paragraph::new(format!("{error}  (x to dismiss)"))
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title("error"));
        frame.render_widget(alert, layout[0]);
    }

    let mode = if detail.is_editing() { "editing" } else { "viewing" };
    let actions = detail
        .visible_actions()
        .iter()
        .map(|action| action.label())
        .collect::<Vec<_>>()
        .join(" · ");
    let fields = Paragraph::new(detail_field_lines(detail, edit_buffer).join("\n"))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{title} [{mode}] {actions}")),
        );
    frame.render_widget(fields, layout[1]);

    let titles = detail
        .tabs()
        .map(|(tab, state)| tab_title(&tab.label, state))
        .collect::<Vec<_>>();
    if titles.is_empty() {
        return;
    }
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("related"))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(detail.active_tab().unwrap_or(0));
    frame.render_widget(tabs, layout[2]);

    let Some((tab, state)) = detail.active_tab().and_then(|index| detail.tabs().nth(index)) else {
        return;
    };
    if let Some(error) = &state.error {
        let alert = Paragraph::new(format!("{error}\npress r to retry"))
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(tab.label.as_str()));
        frame.render_widget(alert, layout[3]);
    } else if state.loading {
        let loading = Paragraph::new("loading…")
            .block(Block::default().borders(Borders::ALL).title(tab.label.as_str()));
        frame.render_widget(loading, layout[3]);
    } else {
        render_table(
            frame,
            layout[3],
            &state.table,
            TableInput::new(state.rows(), &state.selection),
            true,
        );
    }
}

pub fn column_dialog_text<R: Record>(dialog: &ColumnDialog, table: &TableView<R>) -> String {
    dialog
        .entries(table)
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let marker = if index == dialog.cursor { ">" } else { " " };
            let check = if entry.visible { "[x]" } else { "[ ]" };
            format!("{marker} {check} {}", entry.header)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn filter_builder_text<F>(builder: &FilterBuilder<F>) -> String
where
    F: crm_app::FieldKey,
{
    let operator = builder.operator();
    let mut lines = vec![
        format!("{} ({})", builder.header, builder.category),
        format!("operator: {operator}  (tab to change)"),
    ];
    let focus = |input: FilterInput| if builder.focus == input { "_" } else { "" };
    if operator.is_ranged() {
        lines.push(format!("from: {}{}", builder.first, focus(FilterInput::First)));
        lines.push(format!("to:   {}{}", builder.second, focus(FilterInput::Second)));
    } else {
        lines.push(format!("value: {}{}", builder.first, focus(FilterInput::First)));
    }
    lines.push(format!("preview: {}", builder.build().display_value));
    lines.join("\n")
}

pub fn assign_dialog_text(dialog: &AssignUserDialog) -> String {
    if dialog.is_loading() {
        return "loading users…".to_owned();
    }
    if let Some(error) = dialog.error() {
        return format!("could not load users: {error}");
    }
    if dialog.users().is_empty() {
        return "no active users".to_owned();
    }
    dialog
        .users()
        .iter()
        .enumerate()
        .map(|(index, user)| {
            let marker = if index == dialog.cursor() { ">" } else { " " };
            format!("{marker} {} <{}>", user.display_name, user.email)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn row_menu_text(menu: &RowMenu) -> String {
    menu.actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            let marker = if index == menu.cursor { ">" } else { " " };
            format!("{marker} {}", action.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_overlay(frame: &mut ratatui::Frame<'_>, title: &str, body: String, percent_x: u16, percent_y: u16) {
    let area = centered_rect(percent_x, percent_y, frame.area());
    frame.render_widget(Clear, area);
    let widget = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
    frame.render_widget(widget, area);
}

pub fn render_status(frame: &mut ratatui::Frame<'_>, area: Rect, status: &str) {
    let widget = Paragraph::new(status.to_owned())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(widget, area);
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        assign_dialog_text, centered_rect, column_dialog_text, detail_field_lines,
        filter_builder_text, filter_chips_text, render_table, row_menu_text, width_cells,
    };
    use crate::detail::{DetailView, FieldDescriptor, FieldKind};
    use crate::dialogs::{AssignUserDialog, ColumnDialog, FilterBuilder, RowMenu};
    use crate::selection::Selection;
    use crate::service::ServiceResult;
    use crate::table::{Column, RowAction, TableInput, TableView};
    use crm_app::{ColumnKind, CurrentUser, Role, Row, User, UserId};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Rect;

    fn table() -> TableView<Row> {
        TableView::new(
            "deals",
            "id".to_owned(),
            vec![
                Column::new("name".to_owned(), "Name"),
                Column::new("amount".to_owned(), "Amount").kind(ColumnKind::Currency),
            ],
        )
    }

    #[test]
    fn widths_map_pixels_to_cells() {
        assert_eq!(width_cells(80), 10);
        assert_eq!(width_cells(150), 18);
        assert_eq!(width_cells(0), 1);
    }

    #[test]
    fn filter_chips_are_bracketed() {
        assert_eq!(
            filter_chips_text(&["Amount: ≥ 10".to_owned(), "Name: contains \"a\"".to_owned()]),
            "[Amount: ≥ 10] [Name: contains \"a\"]"
        );
    }

    #[test]
    fn column_dialog_marks_hidden_columns() {
        let mut table = table();
        let rows: Vec<Row> = Vec::new();
        let selection = Selection::new();
        table.apply(
            TableInput::new(&rows, &selection),
            crate::table::TableCommand::ToggleColumn("amount".to_owned()),
        );
        let text = column_dialog_text(&ColumnDialog::default(), &table);
        assert_eq!(text, "> [x] Name\n  [ ] Amount");
    }

    #[test]
    fn filter_builder_preview_follows_input() {
        let table = table();
        let mut builder = FilterBuilder::for_cursor(&table).expect("cursor column exists");
        builder.push_char('a');
        let text = filter_builder_text(&builder);
        assert!(text.contains("operator: contains"));
        assert!(text.contains("value: a_"));
        assert!(text.contains("preview: contains \"a\""));
    }

    #[test]
    fn assign_dialog_text_tracks_load_state() {
        let mut dialog = AssignUserDialog::new();
        let request = dialog.open();
        assert_eq!(assign_dialog_text(&dialog), "loading users…");
        dialog.apply(
            request.generation,
            Ok(ServiceResult::new(vec![User {
                id: UserId::new(1),
                display_name: "Ada".to_owned(),
                email: "ada@example.com".to_owned(),
                roles: [Role::Manager].into_iter().collect(),
                is_active: true,
            }])),
        );
        assert_eq!(assign_dialog_text(&dialog), "> Ada <ada@example.com>");
    }

    #[test]
    fn row_menu_lists_labels() {
        let menu = RowMenu::new(vec![RowAction::Edit, RowAction::PermanentDelete]);
        assert_eq!(row_menu_text(&menu), "> Edit\n  Delete permanently");
    }

    #[test]
    fn detail_lines_show_cursor_and_required_marker() -> anyhow::Result<()> {
        let user = CurrentUser::new(UserId::new(1), "Ada", &[Role::Admin]);
        let view = DetailView::new(
            Row::new().with("name", "Acme").with("amount", 1500.0),
            vec![
                FieldDescriptor::new("name".to_owned(), "Name", FieldKind::Text).required(),
                FieldDescriptor::new("amount".to_owned(), "Amount", FieldKind::Currency),
            ],
            Vec::new(),
            user,
        )?;
        assert_eq!(
            detail_field_lines(&view, None),
            vec!["> Name *: Acme".to_owned(), "  Amount: $1,500".to_owned()]
        );
        Ok(())
    }

    #[test]
    fn table_renders_into_a_buffer() -> anyhow::Result<()> {
        let table = table();
        let rows = vec![Row::new().with("id", 1).with("name", "Acme").with("amount", 10.0)];
        let selection = Selection::new();
        let mut terminal = Terminal::new(TestBackend::new(60, 8))?;
        terminal.draw(|frame| {
            render_table(
                frame,
                frame.area(),
                &table,
                TableInput::new(&rows, &selection),
                true,
            );
        })?;
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("deals r:1/1 p:1/1"));
        assert!(text.contains("Acme"));
        assert!(text.contains("$10"));
        Ok(())
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(50, 50, area);
        assert!(popup.x >= area.x && popup.right() <= area.right());
        assert!(popup.y >= area.y && popup.bottom() <= area.bottom());
    }
}
