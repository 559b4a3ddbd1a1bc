// ==========================================
// 到货核对系统 - 文本交互前端
// ==========================================
// 职责: 命令解析、提示、确认与重试循环；渲染引擎返回的结构化结果
// 约定: 引擎只返回结果/待决状态，所有询问都在这里完成
// 输入输出: 泛型 BufRead / Write（测试用 Cursor 驱动）
// ==========================================

use std::io::{BufRead, Write};
use std::path::Path;

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::app::state::AppState;
use crate::domain::order::{Order, OrderLine};
use crate::domain::product::Product;
use crate::domain::types::ReportMode;
use crate::engine::{
    is_scan_finish, parse_confirmation, parse_quantity, AdjustOutcome, EngineError,
    ForceAddDecision, OrderReport, OrderResolution, QuantityEntry, RejectReason,
    ScanOutcome, ScanRequest,
};
use crate::i18n::{t, t_with_args};
use crate::importer::{
    ExistingOrderDecision, ImportError, ImportOptions, ImportOutcome, UniversalDocumentExtractor,
};

/// 命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Initialise,
    LoadOrder(String),
    LoadBarcodes(String),
    ExportBarcodes(String),
    AddBarcode,
    RemoveBarcode,
    CheckOrder,
    VerifyOrder,
    Scan,
    AdjustQuantity,
    RemoveOrder,
    ListOrders,
    ListProducts,
    Exit,
}

impl Command {
    /// 解析命令行（大小写不敏感；路径参数保留原样）
    pub fn parse(line: &str) -> Option<Command> {
        let trimmed = line.trim();
        let lowered = trimmed.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        // 带路径的命令: 前两个词之后的原文（保留路径内的空白）
        let path_arg = || {
            let mut rest = trimmed;
            for _ in 0..2 {
                rest = rest.trim_start();
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                rest = &rest[end..];
            }
            rest.trim().to_string()
        };

        match words.as_slice() {
            ["help"] => Some(Command::Help),
            ["initialise"] | ["initialize"] | ["init"] => Some(Command::Initialise),
            ["load", "order", _, ..] => Some(Command::LoadOrder(path_arg())),
            ["load", "barcodes", _, ..] => Some(Command::LoadBarcodes(path_arg())),
            ["export", "barcodes", _, ..] => Some(Command::ExportBarcodes(path_arg())),
            ["add", "barcode"] => Some(Command::AddBarcode),
            ["remove", "barcode"] => Some(Command::RemoveBarcode),
            ["check", "order"] => Some(Command::CheckOrder),
            ["verify", "order"] => Some(Command::VerifyOrder),
            ["scan"] => Some(Command::Scan),
            ["adjust", "quantity"] => Some(Command::AdjustQuantity),
            ["remove", "order"] => Some(Command::RemoveOrder),
            ["list", "orders"] => Some(Command::ListOrders),
            ["list", "products"] => Some(Command::ListProducts),
            ["exit"] | ["quit"] => Some(Command::Exit),
            _ => None,
        }
    }

    fn needs_database(&self) -> bool {
        !matches!(self, Command::Help | Command::Initialise | Command::Exit)
    }
}

// ==========================================
// Cli - 交互会话
// ==========================================
pub struct Cli<'a, R, W> {
    state: &'a mut AppState,
    input: R,
    output: W,
    today: NaiveDate,
}

impl<'a, R: BufRead, W: Write> Cli<'a, R, W> {
    pub fn new(state: &'a mut AppState, input: R, output: W) -> Self {
        Self {
            state,
            input,
            output,
            today: Local::now().date_naive(),
        }
    }

    /// 固定登记日期（测试用）
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// 主循环，直到 exit 或输入结束
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.say(&t_with_args("cli.welcome", &[("version", crate::VERSION)]))?;

        loop {
            let Some(line) = self.prompt(&t("cli.prompt"))? else {
                break;
            };
            if line.is_empty() {
                continue;
            }

            let Some(command) = Command::parse(&line) else {
                self.say(&t_with_args("cli.unknown_command", &[("command", &line)]))?;
                continue;
            };
            debug!(?command, "执行命令");

            if command == Command::Exit {
                break;
            }
            if command.needs_database() && !self.state.is_initialised()? {
                self.say(&t("cli.not_initialised"))?;
                continue;
            }

            self.dispatch(command)?;
        }

        self.say(&t("cli.goodbye"))?;
        Ok(())
    }

    fn dispatch(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Help => self.say(&t("cli.help")),
            Command::Initialise => {
                self.state.initialise()?;
                self.say(&t("cli.initialised"))
            }
            Command::LoadOrder(path) => self.load_order(&path),
            Command::LoadBarcodes(path) => self.load_barcodes(&path),
            Command::ExportBarcodes(path) => self.export_barcodes(&path),
            Command::AddBarcode => self.add_barcode(),
            Command::RemoveBarcode => self.remove_barcode(),
            Command::CheckOrder => self.show_order(ReportMode::Full),
            Command::VerifyOrder => self.show_order(ReportMode::DiscrepanciesOnly),
            Command::Scan => self.scan_session(),
            Command::AdjustQuantity => self.adjust_quantity(),
            Command::RemoveOrder => self.remove_order(),
            Command::ListOrders => {
                let orders = self.state.reports.render_orders()?;
                self.print_orders(&orders)
            }
            Command::ListProducts => {
                let products = self.state.reports.render_catalog()?;
                self.print_products(&products)
            }
            Command::Exit => Ok(()),
        }
    }

    // ===== 输入输出 =====

    fn say(&mut self, message: &str) -> anyhow::Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    /// 输出提示并读取一行；输入结束返回 None
    fn prompt(&mut self, message: &str) -> anyhow::Result<Option<String>> {
        write!(self.output, "{} ", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// 询问是/否，无法识别时重新询问；输入结束视为否
    fn confirm(&mut self, message: &str) -> anyhow::Result<bool> {
        loop {
            let Some(answer) = self.prompt(message)? else {
                return Ok(false);
            };
            match parse_confirmation(&answer) {
                Some(decision) => return Ok(decision),
                None => self.say(&t("cli.confirm_retry"))?,
            }
        }
    }

    /// 询问数量；取消或非整数时返回 None（不重试）
    fn ask_quantity(&mut self, message: &str) -> anyhow::Result<Option<i64>> {
        let Some(answer) = self.prompt(message)? else {
            return Ok(None);
        };
        match parse_quantity(&answer) {
            Ok(QuantityEntry::Quantity(q)) => Ok(Some(q)),
            Ok(QuantityEntry::Cancelled) => {
                self.say(&t("cli.cancelled"))?;
                Ok(None)
            }
            Err(e) => {
                self.say(&e.to_string())?;
                self.say(&t("cli.cancelled"))?;
                Ok(None)
            }
        }
    }

    /// 询问订单，直到命中或取消
    fn ask_order(&mut self) -> anyhow::Result<Option<i64>> {
        loop {
            let Some(token) = self.prompt(&t("cli.ask_order"))? else {
                return Ok(None);
            };
            match self.state.resolver.resolve(&token) {
                Ok(OrderResolution::Cancelled) => return Ok(None),
                Ok(OrderResolution::Resolved { order_number, .. }) => return Ok(Some(order_number)),
                Err(e @ (EngineError::NotFound { .. } | EngineError::AmbiguousReference { .. })) => {
                    self.say(&e.to_string())?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// 可恢复的引擎错误只提示；存储错误向上抛出
    fn report_engine_error(&mut self, err: EngineError) -> anyhow::Result<()> {
        match err {
            EngineError::Repository(e) => Err(e.into()),
            other => self.say(&other.to_string()),
        }
    }

    // ===== 导入导出 =====

    fn load_order(&mut self, path: &str) -> anyhow::Result<()> {
        let path = Path::new(path);
        let mut options = ImportOptions {
            existing_order: ExistingOrderDecision::Ask,
            duplicate_lines: self.state.config.duplicate_line_policy()?,
        };

        loop {
            let result =
                self.state
                    .importer
                    .import_file(path, &UniversalDocumentExtractor, options);

            match result {
                Ok(ImportOutcome::Imported(summary)) => {
                    return self.say(&t_with_args(
                        "import.order_done",
                        &[
                            ("order", &summary.order_number.to_string()),
                            ("reference", &summary.internal_reference),
                            ("created", &summary.lines_created.to_string()),
                            ("merged", &summary.lines_merged.to_string()),
                            ("kept", &summary.lines_kept.to_string()),
                            ("out_of_range", &summary.lines_out_of_range.to_string()),
                            ("skipped", &summary.rows_skipped.to_string()),
                        ],
                    ));
                }
                Ok(ImportOutcome::OrderExists { order_number, .. }) => {
                    let question = t_with_args(
                        "import.order_exists",
                        &[("order", &order_number.to_string())],
                    );
                    options.existing_order = if self.confirm(&question)? {
                        ExistingOrderDecision::Continue
                    } else {
                        ExistingOrderDecision::Abort
                    };
                }
                Err(ImportError::Declined) => return self.say(&t("cli.cancelled")),
                Err(ImportError::FileNotFound(p)) => {
                    return self.say(&t_with_args("import.file_not_found", &[("path", &p)]));
                }
                Err(ImportError::Repository(e)) => return Err(e.into()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "订单导入失败");
                    return self.say(&e.to_string());
                }
            }
        }
    }

    fn load_barcodes(&mut self, path: &str) -> anyhow::Result<()> {
        match self.state.transfer.import_barcodes(Path::new(path), self.today) {
            Ok(summary) => self.say(&t_with_args(
                "import.barcodes_done",
                &[
                    ("inserted", &summary.inserted.to_string()),
                    ("skipped", &summary.skipped_existing.to_string()),
                    ("rejected", &summary.rejected.to_string()),
                ],
            )),
            Err(ImportError::FileNotFound(p)) => {
                self.say(&t_with_args("import.file_not_found", &[("path", &p)]))
            }
            Err(ImportError::Repository(e)) => Err(e.into()),
            Err(e) => self.say(&e.to_string()),
        }
    }

    fn export_barcodes(&mut self, path: &str) -> anyhow::Result<()> {
        match self.state.transfer.export_barcodes(Path::new(path)) {
            Ok(count) => self.say(&t_with_args(
                "import.barcodes_exported",
                &[("count", &count.to_string()), ("path", path)],
            )),
            Err(ImportError::Repository(e)) => Err(e.into()),
            Err(e) => self.say(&e.to_string()),
        }
    }

    // ===== 条码目录 =====

    fn add_barcode(&mut self) -> anyhow::Result<()> {
        let Some(barcode) = self.prompt(&t("catalog.ask_barcode"))? else {
            return Ok(());
        };
        self.register_barcode(&barcode).map(|_| ())
    }

    /// 询问产品编码并登记；编码格式错误时重新询问
    fn register_barcode(&mut self, barcode: &str) -> anyhow::Result<bool> {
        loop {
            let Some(code) = self.prompt(&t("catalog.ask_code"))? else {
                return Ok(false);
            };
            if parse_confirmation(&code) == Some(false) {
                self.say(&t("cli.cancelled"))?;
                return Ok(false);
            }

            match self.state.catalog.add_product(barcode, &code, self.today) {
                Ok(product) => {
                    self.say(&t_with_args(
                        "catalog.added",
                        &[
                            ("barcode", &product.barcode),
                            ("code", product.product_code.as_str()),
                        ],
                    ))?;
                    return Ok(true);
                }
                Err(e @ EngineError::InvalidFormat(_)) => self.say(&e.to_string())?,
                Err(e) => {
                    self.report_engine_error(e)?;
                    return Ok(false);
                }
            }
        }
    }

    fn remove_barcode(&mut self) -> anyhow::Result<()> {
        let Some(barcode) = self.prompt(&t("catalog.ask_barcode"))? else {
            return Ok(());
        };
        match self.state.catalog.remove_product(&barcode) {
            Ok(()) => self.say(&t_with_args("catalog.removed", &[("barcode", &barcode)])),
            Err(e) => self.report_engine_error(e),
        }
    }

    // ===== 订单 =====

    fn show_order(&mut self, mode: ReportMode) -> anyhow::Result<()> {
        let Some(order_number) = self.ask_order()? else {
            return Ok(());
        };
        match self.state.reports.render_order(order_number, mode) {
            Ok(report) => self.print_report(&report),
            Err(e) => self.report_engine_error(e),
        }
    }

    fn remove_order(&mut self) -> anyhow::Result<()> {
        let Some(order_number) = self.ask_order()? else {
            return Ok(());
        };
        let question = t_with_args("order.confirm_remove", &[("order", &order_number.to_string())]);
        if !self.confirm(&question)? {
            return self.say(&t("cli.cancelled"));
        }

        match self.state.orders.remove_order(order_number) {
            Ok(lines) => self.say(&t_with_args(
                "order.removed",
                &[("order", &order_number.to_string()), ("lines", &lines.to_string())],
            )),
            Err(e) => self.report_engine_error(e),
        }
    }

    fn adjust_quantity(&mut self) -> anyhow::Result<()> {
        let Some(order_number) = self.ask_order()? else {
            return Ok(());
        };
        let Some(code) = self.prompt(&t("scan.ask_code"))? else {
            return Ok(());
        };
        let Some(quantity) = self.ask_quantity(&t("order.ask_expected"))? else {
            return Ok(());
        };

        let mut decision = ForceAddDecision::Ask;
        loop {
            let outcome = match self.state.reconciliation.adjust_expected_quantity(
                order_number,
                &code,
                quantity,
                decision,
            ) {
                Ok(outcome) => outcome,
                Err(e) => return self.report_engine_error(e),
            };

            match outcome {
                AdjustOutcome::Updated {
                    line,
                    previous_expected,
                } => {
                    return self.say(&t_with_args(
                        "order.expected_updated",
                        &[
                            ("code", line.product_code.as_str()),
                            ("from", &previous_expected.to_string()),
                            ("to", &line.expected_quantity.to_string()),
                        ],
                    ));
                }
                AdjustOutcome::Created { line } => return self.print_line(&line),
                AdjustOutcome::ConfirmationRequired { product_code } => {
                    let question =
                        t_with_args("scan.confirm_force_add", &[("code", product_code.as_str())]);
                    decision = if self.confirm(&question)? {
                        ForceAddDecision::Confirm
                    } else {
                        ForceAddDecision::Decline
                    };
                }
                AdjustOutcome::Rejected { .. } => return self.say(&t("cli.cancelled")),
            }
        }
    }

    // ===== 扫码 =====

    fn scan_session(&mut self) -> anyhow::Result<()> {
        let Some(order_number) = self.ask_order()? else {
            return Ok(());
        };
        self.say(&t_with_args("scan.started", &[("order", &order_number.to_string())]))?;

        loop {
            let Some(token) = self.prompt(&t("scan.ask_input"))? else {
                break;
            };
            if token.is_empty() {
                continue;
            }
            if is_scan_finish(&token) {
                break;
            }
            self.scan_once(order_number, &token)?;
        }

        match self
            .state
            .reports
            .render_order(order_number, ReportMode::DiscrepanciesOnly)
        {
            Ok(report) => self.print_report(&report),
            Err(e) => self.report_engine_error(e),
        }
    }

    /// 处理一次扫码，按引擎返回的待决状态逐步询问
    fn scan_once(&mut self, order_number: i64, token: &str) -> anyhow::Result<()> {
        let mut request = ScanRequest::new(order_number, token);

        loop {
            let outcome = match self.state.reconciliation.apply_scan_event(&request) {
                Ok(outcome) => outcome,
                Err(e) => return self.report_engine_error(e),
            };

            match outcome {
                ScanOutcome::LineUpdated { line, .. } | ScanOutcome::LineCreated { line, .. } => {
                    return self.print_line(&line);
                }
                ScanOutcome::QuantityRequired { product_code, .. } => {
                    let question =
                        t_with_args("scan.ask_quantity", &[("code", product_code.as_str())]);
                    match self.ask_quantity(&question)? {
                        Some(q) => request = request.with_quantity(q),
                        None => return Ok(()),
                    }
                }
                ScanOutcome::ConfirmationRequired { product_code, .. } => {
                    let question =
                        t_with_args("scan.confirm_force_add", &[("code", product_code.as_str())]);
                    if !self.confirm(&question)? {
                        return self.say(&t("cli.cancelled"));
                    }
                    request = request.with_force_add(ForceAddDecision::Confirm);
                }
                ScanOutcome::Rejected {
                    reason: RejectReason::InvalidInput,
                } => {
                    let question = t_with_args("scan.offer_register", &[("input", token)]);
                    if !self.confirm(&question)? || !self.register_barcode(token)? {
                        return Ok(());
                    }
                }
                ScanOutcome::Rejected {
                    reason: RejectReason::Declined,
                } => return self.say(&t("cli.cancelled")),
                ScanOutcome::Rejected {
                    reason: RejectReason::QuantityOutOfRange,
                } => return self.say(&t("scan.quantity_out_of_range")),
            }
        }
    }

    // ===== 渲染 =====

    fn print_line(&mut self, line: &OrderLine) -> anyhow::Result<()> {
        let text = t_with_args(
            "report.line",
            &[
                ("code", line.product_code.as_str()),
                ("expected", &line.expected_quantity.to_string()),
                ("scanned", &line.scanned_quantity.to_string()),
                ("discrepancy", &line.discrepancy().to_string()),
            ],
        );
        self.say(&text)
    }

    fn print_report(&mut self, report: &OrderReport) -> anyhow::Result<()> {
        self.say(&t_with_args(
            "report.order_title",
            &[
                ("order", &report.order.order_number.to_string()),
                ("reference", &report.order.internal_reference),
            ],
        ))?;

        if report.rows.is_empty() {
            let key = match report.mode {
                ReportMode::Full => "report.no_lines",
                ReportMode::DiscrepanciesOnly => "report.no_discrepancies",
            };
            self.say(&t(key))?;
        } else {
            self.say(&format!(
                "{:<10}{:>10}{:>10}{:>10}",
                t("report.col_code"),
                t("report.col_expected"),
                t("report.col_scanned"),
                t("report.col_discrepancy"),
            ))?;
            for row in &report.rows {
                self.say(&format!(
                    "{:<10}{:>10}{:>10}{:>10}",
                    row.product_code.as_str(),
                    row.expected_quantity,
                    row.scanned_quantity,
                    row.discrepancy
                ))?;
            }
        }

        let summary = &report.summary;
        self.say(&t_with_args(
            "report.summary",
            &[
                ("lines", &summary.line_count.to_string()),
                ("reconciled", &summary.reconciled_lines.to_string()),
                ("missing", &summary.missing_units.to_string()),
                ("excess", &summary.excess_units.to_string()),
            ],
        ))
    }

    fn print_orders(&mut self, orders: &[Order]) -> anyhow::Result<()> {
        if orders.is_empty() {
            return self.say(&t("report.no_orders"));
        }
        for order in orders {
            self.say(&format!("{:<12}{}", order.order_number, order.internal_reference))?;
        }
        Ok(())
    }

    fn print_products(&mut self, products: &[Product]) -> anyhow::Result<()> {
        if products.is_empty() {
            return self.say(&t("report.no_products"));
        }
        for p in products {
            self.say(&format!(
                "{:<10}{:<20}{:<12}{}",
                p.product_code.as_str(),
                p.barcode,
                p.last_update.format("%Y-%m-%d"),
                if p.is_primary { "*" } else { "" }
            ))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(" HELP "), Some(Command::Help));
        assert_eq!(Command::parse("check order"), Some(Command::CheckOrder));
        assert_eq!(
            Command::parse("load order /tmp/My Order.csv"),
            Some(Command::LoadOrder("/tmp/My Order.csv".to_string()))
        );
        assert_eq!(
            Command::parse("load  barcodes   /tmp/a  b.csv  "),
            Some(Command::LoadBarcodes("/tmp/a  b.csv".to_string()))
        );
        assert_eq!(
            Command::parse("Export Barcodes out.csv"),
            Some(Command::ExportBarcodes("out.csv".to_string()))
        );
        assert_eq!(Command::parse("load order"), None);
        assert_eq!(Command::parse("frobnicate"), None);
    }

    #[test]
    fn test_database_guard() {
        assert!(!Command::Help.needs_database());
        assert!(!Command::Initialise.needs_database());
        assert!(Command::Scan.needs_database());
        assert!(Command::LoadOrder("x".into()).needs_database());
    }
}
