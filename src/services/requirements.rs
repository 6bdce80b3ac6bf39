use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::entities::requirement;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::requirement::rollup_status;
use crate::models::{LineStatus, RequirementLine, RequirementStatus};
use crate::services::catalog::CatalogService;
use crate::services::reservations::ReservationService;

/// A warehouse decision on one requirement line.
#[derive(Debug, Clone)]
pub struct LineDecision {
    pub medicine_id: Uuid,
    pub status: LineStatus,
    pub approved_quantity: i32,
}

/// Net reservation movement caused by a decision, for event emission.
#[derive(Debug, Clone)]
pub struct ReservationChange {
    pub medicine_id: Uuid,
    pub delta: i32,
}

/// Strategy seam for how approval decisions are applied. One policy is
/// selected per deployment.
#[async_trait]
pub trait ApprovalPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        reservations: &ReservationService,
        warehouse_id: Uuid,
        lines: &mut [RequirementLine],
        decisions: &[LineDecision],
    ) -> Result<Vec<ReservationChange>, ServiceError>;
}

/// Writes a requirement document back, guarded by the record version.
/// Zero rows updated means another writer decided concurrently.
pub(crate) async fn persist_requirement<C: ConnectionTrait>(
    conn: &C,
    record: &requirement::Model,
    lines: &[RequirementLine],
    status: RequirementStatus,
    logistic_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    let json = requirement::lines_to_json(lines)?;
    let result = requirement::Entity::update_many()
        .col_expr(requirement::Column::Lines, Expr::value(json))
        .col_expr(
            requirement::Column::OverallStatus,
            Expr::value(status.to_string()),
        )
        .col_expr(requirement::Column::LogisticId, Expr::value(logistic_id))
        .col_expr(
            requirement::Column::Version,
            Expr::value(record.version + 1),
        )
        .col_expr(requirement::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(requirement::Column::Id.eq(record.id))
        .filter(requirement::Column::Version.eq(record.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(record.id));
    }
    Ok(())
}

fn check_no_duplicates(decisions: &[LineDecision]) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for d in decisions {
        if !seen.insert(d.medicine_id) {
            return Err(ServiceError::ValidationError(format!(
                "duplicate decision for medicine {}",
                d.medicine_id
            )));
        }
    }
    Ok(())
}

/// Applies one decision to its line, moving reservations by the delta
/// between the new and previous approved quantity.
async fn apply_decision(
    txn: &DatabaseTransaction,
    reservations: &ReservationService,
    warehouse_id: Uuid,
    lines: &mut [RequirementLine],
    decision: &LineDecision,
) -> Result<ReservationChange, ServiceError> {
    let line = lines
        .iter_mut()
        .find(|l| l.medicine_id == decision.medicine_id)
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "requirement has no line for medicine {}",
                decision.medicine_id
            ))
        })?;

    match decision.status {
        LineStatus::Approved => {
            if decision.approved_quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "approved quantity must be at least 1".to_string(),
                ));
            }
            if decision.approved_quantity > line.requested_quantity {
                return Err(ServiceError::ValidationError(format!(
                    "approved quantity {} exceeds requested {}",
                    decision.approved_quantity, line.requested_quantity
                )));
            }
            let delta = decision.approved_quantity - line.approved_quantity;
            if delta > 0 {
                reservations
                    .reserve(txn, warehouse_id, decision.medicine_id, delta)
                    .await?;
            } else if delta < 0 {
                reservations
                    .release(txn, warehouse_id, decision.medicine_id, -delta)
                    .await?;
            }
            line.approved_quantity = decision.approved_quantity;
            line.status = LineStatus::Approved;
            Ok(ReservationChange {
                medicine_id: decision.medicine_id,
                delta,
            })
        }
        LineStatus::Rejected => {
            let released = line.approved_quantity;
            if released > 0 {
                reservations
                    .release(txn, warehouse_id, decision.medicine_id, released)
                    .await?;
            }
            line.approved_quantity = 0;
            line.status = LineStatus::Rejected;
            Ok(ReservationChange {
                medicine_id: decision.medicine_id,
                delta: -released,
            })
        }
        LineStatus::Pending => Err(ServiceError::ValidationError(
            "a decision cannot set a line back to pending".to_string(),
        )),
    }
}

/// Primary policy: a decision either fully approves every line or rejects
/// the whole requirement. No partial states.
pub struct AllOrNothingPolicy;

impl AllOrNothingPolicy {
    /// Pure decision-shape check, split out for testing. Returns whether
    /// the decision set means approval.
    fn classify(
        lines: &[RequirementLine],
        decisions: &[LineDecision],
    ) -> Result<bool, ServiceError> {
        check_no_duplicates(decisions)?;
        let rejecting = decisions.iter().any(|d| d.status == LineStatus::Rejected);
        if rejecting {
            if decisions.iter().any(|d| d.status == LineStatus::Approved) {
                return Err(ServiceError::ValidationError(
                    "all-or-nothing policy cannot mix approvals and rejections".to_string(),
                ));
            }
            return Ok(false);
        }
        if decisions.len() != lines.len() {
            return Err(ServiceError::ValidationError(
                "all-or-nothing policy requires a decision for every line".to_string(),
            ));
        }
        for line in lines {
            let matched = decisions
                .iter()
                .find(|d| d.medicine_id == line.medicine_id)
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "missing decision for medicine {}",
                        line.medicine_id
                    ))
                })?;
            if matched.approved_quantity != line.requested_quantity {
                return Err(ServiceError::ValidationError(format!(
                    "all-or-nothing policy must approve the full requested quantity for medicine {}",
                    line.medicine_id
                )));
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ApprovalPolicy for AllOrNothingPolicy {
    fn name(&self) -> &'static str {
        "all_or_nothing"
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        reservations: &ReservationService,
        warehouse_id: Uuid,
        lines: &mut [RequirementLine],
        decisions: &[LineDecision],
    ) -> Result<Vec<ReservationChange>, ServiceError> {
        let approving = Self::classify(lines, decisions)?;
        let mut changes = Vec::with_capacity(lines.len());
        let targets: Vec<LineDecision> = lines
            .iter()
            .map(|l| LineDecision {
                medicine_id: l.medicine_id,
                status: if approving {
                    LineStatus::Approved
                } else {
                    LineStatus::Rejected
                },
                approved_quantity: if approving { l.requested_quantity } else { 0 },
            })
            .collect();
        for decision in &targets {
            changes.push(apply_decision(txn, reservations, warehouse_id, lines, decision).await?);
        }
        Ok(changes)
    }
}

/// Alternate policy: per-line decisions with partial approval; the overall
/// status is rolled up from line states.
pub struct LineLevelPolicy;

#[async_trait]
impl ApprovalPolicy for LineLevelPolicy {
    fn name(&self) -> &'static str {
        "line_level"
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        reservations: &ReservationService,
        warehouse_id: Uuid,
        lines: &mut [RequirementLine],
        decisions: &[LineDecision],
    ) -> Result<Vec<ReservationChange>, ServiceError> {
        if decisions.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one line decision is required".to_string(),
            ));
        }
        check_no_duplicates(decisions)?;
        let mut changes = Vec::with_capacity(decisions.len());
        for decision in decisions {
            changes.push(apply_decision(txn, reservations, warehouse_id, lines, decision).await?);
        }
        Ok(changes)
    }
}

pub fn policy_from_name(name: &str) -> Result<Arc<dyn ApprovalPolicy>, ServiceError> {
    match name {
        "all_or_nothing" => Ok(Arc::new(AllOrNothingPolicy)),
        "line_level" => Ok(Arc::new(LineLevelPolicy)),
        other => Err(ServiceError::ValidationError(format!(
            "unknown approval policy '{other}'"
        ))),
    }
}

/// Institution requirement lifecycle: creation, warehouse decisions and
/// role-scoped reads.
pub struct RequirementService {
    db: Arc<DatabaseConnection>,
    catalog: Arc<CatalogService>,
    reservations: Arc<ReservationService>,
    policy: Arc<dyn ApprovalPolicy>,
    event_sender: Option<EventSender>,
}

impl RequirementService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        catalog: Arc<CatalogService>,
        reservations: Arc<ReservationService>,
        policy: Arc<dyn ApprovalPolicy>,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            catalog,
            reservations,
            policy,
            event_sender,
        }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    #[instrument(skip(self, lines))]
    pub async fn create(
        &self,
        actor: Principal,
        institution_id: Uuid,
        warehouse_id: Uuid,
        lines: Vec<(Uuid, i32)>,
    ) -> Result<requirement::Model, ServiceError> {
        actor.require_role(Role::Institution)?;
        actor.require_owner(institution_id)?;
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "a requirement needs at least one line".to_string(),
            ));
        }
        if lines.iter().any(|(_, q)| *q < 1) {
            return Err(ServiceError::ValidationError(
                "requested quantity must be at least 1".to_string(),
            ));
        }
        let medicine_ids: Vec<Uuid> = lines.iter().map(|(m, _)| *m).collect();
        let unique: HashSet<Uuid> = medicine_ids.iter().copied().collect();
        if unique.len() != medicine_ids.len() {
            return Err(ServiceError::ValidationError(
                "duplicate medicine in requirement lines".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        self.catalog.ensure_institution(&txn, institution_id).await?;
        self.catalog.ensure_warehouse(&txn, warehouse_id).await?;
        self.catalog
            .ensure_medicines_exist(&txn, &medicine_ids)
            .await?;

        let doc_lines: Vec<RequirementLine> = lines
            .iter()
            .map(|(m, q)| RequirementLine::new(*m, *q))
            .collect();
        let now = Utc::now();
        let model = requirement::ActiveModel {
            id: Set(Uuid::new_v4()),
            institution_id: Set(institution_id),
            warehouse_id: Set(warehouse_id),
            lines: Set(requirement::lines_to_json(&doc_lines)?),
            overall_status: Set(RequirementStatus::Pending.to_string()),
            logistic_id: Set(None),
            version: Set(0),
            is_deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(requirement_id = %model.id, line_count = doc_lines.len(), "requirement created");

        if let Some(sender) = &self.event_sender {
            sender
                .send(Event::RequirementCreated {
                    requirement_id: model.id,
                    institution_id,
                    warehouse_id,
                    line_count: doc_lines.len(),
                })
                .await;
        }
        Ok(model)
    }

    /// Applies a warehouse decision through the configured policy. The
    /// whole decision is transactional: a single failing line aborts
    /// everything, leaving no reservation behind.
    #[instrument(skip(self, decisions))]
    pub async fn decide(
        &self,
        actor: Principal,
        requirement_id: Uuid,
        decisions: Vec<LineDecision>,
    ) -> Result<requirement::Model, ServiceError> {
        actor.require_role(Role::Warehouse)?;
        let txn = self.db.begin().await?;
        let model = requirement::Entity::find_by_id(requirement_id)
            .one(&txn)
            .await?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("requirement {requirement_id}")))?;
        actor.require_owner(model.warehouse_id)?;

        if model.logistic_id.is_some() {
            return Err(ServiceError::InvalidStateTransition(
                "requirement already has a shipment".to_string(),
            ));
        }
        let status = model.status()?;
        if !status.is_decidable() {
            return Err(ServiceError::InvalidStateTransition(format!(
                "requirement is {status}, decisions are closed"
            )));
        }

        let mut lines = model.lines()?;
        let changes = self
            .policy
            .apply(&txn, &self.reservations, model.warehouse_id, &mut lines, &decisions)
            .await?;
        let new_status = rollup_status(&lines);

        let warehouse_id = model.warehouse_id;
        let institution_id = model.institution_id;
        persist_requirement(&txn, &model, &lines, new_status, model.logistic_id).await?;
        txn.commit().await?;
        info!(%requirement_id, status = %new_status, "requirement decided");

        if let Some(sender) = &self.event_sender {
            for change in &changes {
                if change.delta > 0 {
                    sender
                        .send(Event::StockReserved {
                            warehouse_id,
                            medicine_id: change.medicine_id,
                            quantity: change.delta,
                            requirement_id,
                        })
                        .await;
                } else if change.delta < 0 {
                    sender
                        .send(Event::ReservationReleased {
                            warehouse_id,
                            medicine_id: change.medicine_id,
                            quantity: -change.delta,
                            requirement_id,
                        })
                        .await;
                }
            }
            sender
                .send(Event::RequirementDecided {
                    requirement_id,
                    institution_id,
                    overall_status: new_status.to_string(),
                })
                .await;
        }
        requirement::Entity::find_by_id(requirement_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("requirement {requirement_id}")))
    }

    /// Rejects every line, releasing whatever was reserved.
    pub async fn reject(
        &self,
        actor: Principal,
        requirement_id: Uuid,
    ) -> Result<requirement::Model, ServiceError> {
        let model = requirement::Entity::find_by_id(requirement_id)
            .one(&*self.db)
            .await?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("requirement {requirement_id}")))?;
        let decisions: Vec<LineDecision> = model
            .lines()?
            .iter()
            .map(|l| LineDecision {
                medicine_id: l.medicine_id,
                status: LineStatus::Rejected,
                approved_quantity: 0,
            })
            .collect();
        self.decide(actor, requirement_id, decisions).await
    }

    pub async fn get(
        &self,
        actor: Principal,
        requirement_id: Uuid,
    ) -> Result<requirement::Model, ServiceError> {
        let model = requirement::Entity::find_by_id(requirement_id)
            .one(&*self.db)
            .await?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("requirement {requirement_id}")))?;
        match actor.role {
            Role::Admin => {}
            Role::Institution => actor.require_owner(model.institution_id)?,
            Role::Warehouse => actor.require_owner(model.warehouse_id)?,
        }
        Ok(model)
    }

    /// Requirements visible to the caller: own documents for institutions,
    /// inbound documents for warehouses, everything for admins.
    pub async fn list(&self, actor: Principal) -> Result<Vec<requirement::Model>, ServiceError> {
        let mut query = requirement::Entity::find()
            .filter(requirement::Column::IsDeleted.eq(false))
            .order_by_desc(requirement::Column::CreatedAt);
        query = match actor.role {
            Role::Admin => query,
            Role::Institution => query.filter(requirement::Column::InstitutionId.eq(actor.id)),
            Role::Warehouse => query.filter(requirement::Column::WarehouseId.eq(actor.id)),
        };
        Ok(query.all(&*self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<RequirementLine> {
        vec![
            RequirementLine::new(Uuid::new_v4(), 10),
            RequirementLine::new(Uuid::new_v4(), 20),
        ]
    }

    fn full_approval(lines: &[RequirementLine]) -> Vec<LineDecision> {
        lines
            .iter()
            .map(|l| LineDecision {
                medicine_id: l.medicine_id,
                status: LineStatus::Approved,
                approved_quantity: l.requested_quantity,
            })
            .collect()
    }

    #[test]
    fn all_or_nothing_accepts_full_approval() {
        let lines = lines();
        let decisions = full_approval(&lines);
        assert!(AllOrNothingPolicy::classify(&lines, &decisions).unwrap());
    }

    #[test]
    fn all_or_nothing_accepts_rejection() {
        let lines = lines();
        let decisions = vec![LineDecision {
            medicine_id: lines[0].medicine_id,
            status: LineStatus::Rejected,
            approved_quantity: 0,
        }];
        assert!(!AllOrNothingPolicy::classify(&lines, &decisions).unwrap());
    }

    #[test]
    fn all_or_nothing_refuses_partial_quantity() {
        let lines = lines();
        let mut decisions = full_approval(&lines);
        decisions[1].approved_quantity -= 5;
        assert!(AllOrNothingPolicy::classify(&lines, &decisions).is_err());
    }

    #[test]
    fn all_or_nothing_refuses_missing_line() {
        let lines = lines();
        let mut decisions = full_approval(&lines);
        decisions.pop();
        assert!(AllOrNothingPolicy::classify(&lines, &decisions).is_err());
    }

    #[test]
    fn all_or_nothing_refuses_mixed_decisions() {
        let lines = lines();
        let mut decisions = full_approval(&lines);
        decisions[1].status = LineStatus::Rejected;
        assert!(AllOrNothingPolicy::classify(&lines, &decisions).is_err());
    }

    #[test]
    fn policies_resolve_by_name() {
        assert_eq!(policy_from_name("all_or_nothing").unwrap().name(), "all_or_nothing");
        assert_eq!(policy_from_name("line_level").unwrap().name(), "line_level");
        assert!(policy_from_name("bespoke").is_err());
    }

    #[tokio::test]
    async fn a_stale_read_cannot_overwrite_a_newer_decision() {
        use assert_matches::assert_matches;
        use sea_orm::{ConnectOptions, Database};
        use sea_orm_migration::MigratorTrait;

        use crate::migrator::Migrator;

        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.expect("connect sqlite");
        Migrator::up(&db, None).await.expect("migrations");

        let now = Utc::now();
        let doc_lines = vec![RequirementLine::new(Uuid::new_v4(), 5)];
        let model = requirement::ActiveModel {
            id: Set(Uuid::new_v4()),
            institution_id: Set(Uuid::new_v4()),
            warehouse_id: Set(Uuid::new_v4()),
            lines: Set(requirement::lines_to_json(&doc_lines).unwrap()),
            overall_status: Set(RequirementStatus::Pending.to_string()),
            logistic_id: Set(None),
            version: Set(0),
            is_deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .expect("insert requirement");

        persist_requirement(&db, &model, &doc_lines, RequirementStatus::Approved, None)
            .await
            .expect("first decision");
        // A second writer working from the same read must not win.
        let err = persist_requirement(&db, &model, &doc_lines, RequirementStatus::Rejected, None)
            .await
            .expect_err("stale decision");
        assert_matches!(err, ServiceError::ConcurrentModification(_));

        let current = requirement::Entity::find_by_id(model.id)
            .one(&db)
            .await
            .expect("query")
            .expect("row");
        assert_eq!(current.overall_status, RequirementStatus::Approved.to_string());
        assert_eq!(current.version, 1);
    }
}
