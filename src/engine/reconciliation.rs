// ==========================================
// 到货核对系统 - 核对引擎
// ==========================================
// 职责: 处理单次扫码/手工录入事件
//   解析输入 → 定位/创建订单行 → 应用数量规则 → 返回更新后的状态
// 红线:
// - 引擎不做 I/O；需要人工决策时返回 QuantityRequired / ConfirmationRequired，
//   由前端询问后带着决策重新调用
// - 每次调用的读写在同一事务内完成，提交后才返回
// ==========================================

use crate::domain::order::OrderLine;
use crate::domain::types::ProductCode;
use crate::engine::error::{EngineError, EngineResult, Entity};
use crate::repository::{
    with_transaction, OrderLineRepository, OrderRepository, ProductRepository, SharedConnection,
};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

/// 条码扫描的默认增量
pub const BARCODE_SCAN_DELTA: i64 = 1;

/// 强制追加决策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForceAddDecision {
    /// 尚未询问；订单行不存在时返回 ConfirmationRequired
    #[default]
    Ask,
    Confirm,
    Decline,
}

/// 输入来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputSource {
    Barcode { barcode: String },
    ManualCode,
}

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// 既不是已登记条码，也不是合法产品编码
    InvalidInput,
    /// 人工拒绝强制追加
    Declined,
    /// 累加后超出数量范围
    QuantityOutOfRange,
}

/// 扫码请求
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub order_number: i64,
    pub raw_input: String,
    /// 条码扫描缺省为 1；手工编码必须提供
    pub explicit_quantity: Option<i64>,
    pub force_add: ForceAddDecision,
}

impl ScanRequest {
    pub fn new(order_number: i64, raw_input: impl Into<String>) -> Self {
        Self {
            order_number,
            raw_input: raw_input.into(),
            explicit_quantity: None,
            force_add: ForceAddDecision::Ask,
        }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.explicit_quantity = Some(quantity);
        self
    }

    pub fn with_force_add(mut self, decision: ForceAddDecision) -> Self {
        self.force_add = decision;
        self
    }
}

/// 扫码结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanOutcome {
    /// 已有订单行，实扫数量已累加
    LineUpdated {
        line: OrderLine,
        delta: i64,
        source: InputSource,
    },
    /// 订单外产品，已强制追加（应到 = 0）
    LineCreated { line: OrderLine, source: InputSource },
    /// 手工编码缺少数量；未做任何修改
    QuantityRequired {
        product_code: ProductCode,
        on_order: bool,
    },
    /// 订单外产品需确认是否强制追加；未做任何修改
    ConfirmationRequired {
        product_code: ProductCode,
        source: InputSource,
    },
    Rejected { reason: RejectReason },
}

/// 应到数量调整结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustOutcome {
    Updated { line: OrderLine, previous_expected: i64 },
    Created { line: OrderLine },
    ConfirmationRequired { product_code: ProductCode },
    Rejected { reason: RejectReason },
}

// ==========================================
// ReconciliationEngine - 核对引擎
// ==========================================
pub struct ReconciliationEngine {
    conn: SharedConnection,
}

impl ReconciliationEngine {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 处理一次扫码/手工录入
    ///
    /// # 流程
    /// 1. 输入先按条码精确查找；命中则缺省增量为 1
    /// 2. 未命中则转大写按产品编码校验；不合法 → Rejected(InvalidInput)
    /// 3. 订单行存在 → 实扫 += 增量
    /// 4. 订单行不存在 → 按强制追加决策: Ask → ConfirmationRequired，
    ///    Decline → Rejected(Declined)，Confirm → 新建 (应到 0, 实扫 = 增量)
    ///
    /// # 错误
    /// - NotFound(Order): 订单不存在
    pub fn apply_scan_event(&self, request: &ScanRequest) -> EngineResult<ScanOutcome> {
        let outcome = with_transaction(&self.conn, |tx| Self::apply_scan_event_tx(tx, request))?;

        match &outcome {
            ScanOutcome::LineUpdated { line, delta, .. } => info!(
                order_number = line.order_number,
                product_code = %line.product_code,
                delta,
                scanned_quantity = line.scanned_quantity,
                expected_quantity = line.expected_quantity,
                "实扫数量已更新"
            ),
            ScanOutcome::LineCreated { line, .. } => info!(
                order_number = line.order_number,
                product_code = %line.product_code,
                scanned_quantity = line.scanned_quantity,
                "订单外产品已强制追加"
            ),
            other => debug!(order_number = request.order_number, outcome = ?other, "扫码未修改数据"),
        }
        Ok(outcome)
    }

    fn apply_scan_event_tx(conn: &Connection, request: &ScanRequest) -> EngineResult<ScanOutcome> {
        let order_number = request.order_number;
        if !OrderRepository::exists_tx(conn, order_number)? {
            return Err(EngineError::not_found(Entity::Order, order_number));
        }

        let raw = request.raw_input.trim();
        if raw.is_empty() {
            return Ok(ScanOutcome::Rejected {
                reason: RejectReason::InvalidInput,
            });
        }

        // 1) 条码优先
        let (product_code, source) = match ProductRepository::find_by_barcode_tx(conn, raw)? {
            Some(product) => (
                product.product_code,
                InputSource::Barcode {
                    barcode: raw.to_string(),
                },
            ),
            // 2) 手工产品编码
            None => match ProductCode::parse(raw) {
                Ok(code) => (code, InputSource::ManualCode),
                Err(_) => {
                    return Ok(ScanOutcome::Rejected {
                        reason: RejectReason::InvalidInput,
                    })
                }
            },
        };

        let delta = match (&source, request.explicit_quantity) {
            (_, Some(quantity)) => Some(quantity),
            (InputSource::Barcode { .. }, None) => Some(BARCODE_SCAN_DELTA),
            (InputSource::ManualCode, None) => None,
        };

        // 3) 已有订单行
        if let Some(existing) = OrderLineRepository::find_tx(conn, order_number, &product_code)? {
            let Some(delta) = delta else {
                return Ok(ScanOutcome::QuantityRequired {
                    product_code,
                    on_order: true,
                });
            };

            let Some(scanned_quantity) = existing.scanned_quantity.checked_add(delta) else {
                warn!(
                    order_number,
                    product_code = %product_code,
                    scanned_quantity = existing.scanned_quantity,
                    delta,
                    "实扫数量超出范围，未修改"
                );
                return Ok(ScanOutcome::Rejected {
                    reason: RejectReason::QuantityOutOfRange,
                });
            };

            OrderLineRepository::add_scanned_tx(conn, order_number, &product_code, delta)?;
            let line = OrderLine {
                scanned_quantity,
                ..existing
            };
            return Ok(ScanOutcome::LineUpdated {
                line,
                delta,
                source,
            });
        }

        // 4) 订单外产品
        match request.force_add {
            ForceAddDecision::Ask => Ok(ScanOutcome::ConfirmationRequired {
                product_code,
                source,
            }),
            ForceAddDecision::Decline => Ok(ScanOutcome::Rejected {
                reason: RejectReason::Declined,
            }),
            ForceAddDecision::Confirm => {
                let Some(quantity) = delta else {
                    return Ok(ScanOutcome::QuantityRequired {
                        product_code,
                        on_order: false,
                    });
                };

                let line = OrderLine::forced(order_number, product_code, quantity);
                OrderLineRepository::insert_tx(conn, &line)?;
                Ok(ScanOutcome::LineCreated { line, source })
            }
        }
    }

    /// 人工调整应到数量（改为指定值，不是累加）
    ///
    /// 订单行不存在时按决策新建（实扫 = 0）
    ///
    /// # 错误
    /// - NotFound(Order): 订单不存在
    /// - InvalidFormat: 产品编码格式错误
    pub fn adjust_expected_quantity(
        &self,
        order_number: i64,
        product_code: &str,
        new_expected: i64,
        decision: ForceAddDecision,
    ) -> EngineResult<AdjustOutcome> {
        let code = ProductCode::parse(product_code.trim())?;

        let outcome = with_transaction(&self.conn, |tx| -> EngineResult<AdjustOutcome> {
            if !OrderRepository::exists_tx(tx, order_number)? {
                return Err(EngineError::not_found(Entity::Order, order_number));
            }

            if let Some(existing) = OrderLineRepository::find_tx(tx, order_number, &code)? {
                OrderLineRepository::set_expected_tx(tx, order_number, &code, new_expected)?;
                let line = OrderLine {
                    expected_quantity: new_expected,
                    ..existing.clone()
                };
                return Ok(AdjustOutcome::Updated {
                    line,
                    previous_expected: existing.expected_quantity,
                });
            }

            match decision {
                ForceAddDecision::Ask => Ok(AdjustOutcome::ConfirmationRequired {
                    product_code: code.clone(),
                }),
                ForceAddDecision::Decline => Ok(AdjustOutcome::Rejected {
                    reason: RejectReason::Declined,
                }),
                ForceAddDecision::Confirm => {
                    let line = OrderLine::expected(order_number, code.clone(), new_expected);
                    OrderLineRepository::insert_tx(tx, &line)?;
                    Ok(AdjustOutcome::Created { line })
                }
            }
        })?;

        match &outcome {
            AdjustOutcome::Updated {
                line,
                previous_expected,
            } => info!(
                order_number = line.order_number,
                product_code = %line.product_code,
                previous_expected,
                expected_quantity = line.expected_quantity,
                "应到数量已调整"
            ),
            AdjustOutcome::Created { line } => info!(
                order_number = line.order_number,
                product_code = %line.product_code,
                expected_quantity = line.expected_quantity,
                "应到数量调整: 新增订单行"
            ),
            _ => {}
        }
        Ok(outcome)
    }
}
