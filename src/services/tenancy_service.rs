// src/services/tenancy_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{RbacRepository, TenantRepository},
    middleware::tenancy::TenantContext,
    models::{
        auth::{Claims, User},
        tenancy::{Membership, MembershipSummary},
    },
};

// ---
// Decisão da seleção de escola (função pura, sem I/O)
// ---
// zero  -> estado terminal "sem escola"
// um    -> carimba automaticamente (pelo MESMO caminho da seleção explícita)
// vários-> o cliente apresenta a escolha
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    NoMemberships,
    Single(Uuid),
    Multiple,
}

pub fn selection_outcome(memberships: &[MembershipSummary]) -> SelectionOutcome {
    match memberships {
        [] => SelectionOutcome::NoMemberships,
        [only] => SelectionOutcome::Single(only.tenant_id),
        _ => SelectionOutcome::Multiple,
    }
}

#[derive(Clone)]
pub struct TenancyService {
    tenant_repo: TenantRepository,
    rbac_repo: RbacRepository,
}

impl TenancyService {
    pub fn new(tenant_repo: TenantRepository, rbac_repo: RbacRepository) -> Self {
        Self { tenant_repo, rbac_repo }
    }

    /// Resolve o contexto completo de uma requisição autenticada.
    ///
    /// A ordem é fixa: claim -> tenant ativo -> vínculo usável -> cargo ->
    /// conjunto de permissões. Qualquer elo faltando é falha DURA; não
    /// existe contexto parcial nem "de visitante".
    pub async fn resolve_context(
        &self,
        user: &User,
        claims: &Claims,
    ) -> Result<TenantContext, AppError> {
        // 1. O tenant vem do claim do token, nunca da URL
        let tenant_id = claims.tid.ok_or(AppError::NoTenantSelected)?;

        // 2. Tenant precisa existir E estar ativo
        let tenant = self
            .tenant_repo
            .find_active_by_id(tenant_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        // 3. Vínculo ativo e não soft-deletado (pode ter morrido depois
        //    da emissão do token)
        let membership = self
            .tenant_repo
            .find_usable_membership(user.id, tenant.id)
            .await?
            .ok_or(AppError::MembershipNotFound)?;

        // Vínculo suspenso ou soft-deletado nunca vira contexto
        if !membership.is_usable() {
            return Err(AppError::MembershipNotFound);
        }

        // 4. O cargo do vínculo
        let role = self
            .rbac_repo
            .find_role(tenant.id, membership.role_id)
            .await?
            .ok_or(AppError::MembershipNotFound)?;

        // 5. O conjunto transitivo completo de permissões, de uma vez
        let granted = self
            .rbac_repo
            .permission_slugs_for_role(tenant.id, role.id)
            .await?;

        Ok(TenantContext::new(tenant, user.clone(), role, granted))
    }

    pub async fn list_memberships(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MembershipSummary>, AppError> {
        self.tenant_repo.list_membership_summaries(user_id).await
    }

    /// Aceita um convite: marca o token como consumido e cria o vínculo,
    /// na mesma transação.
    pub async fn accept_invitation(
        &self,
        user: &User,
        token: &str,
    ) -> Result<Membership, AppError> {
        let invitation = self
            .tenant_repo
            .find_invitation_by_token(token)
            .await?
            .ok_or(AppError::InvitationInvalid)?;

        // O convite é nominal: o e-mail precisa bater
        if !invitation.email.eq_ignore_ascii_case(&user.email) {
            return Err(AppError::InvitationInvalid);
        }

        let mut tx = self.tenant_repo.pool().begin().await?;

        // Corrida de duplo clique: o primeiro consome, o segundo falha
        let consumed = self
            .tenant_repo
            .mark_invitation_accepted(&mut *tx, invitation.id)
            .await?;
        if !consumed {
            return Err(AppError::InvitationInvalid);
        }

        let membership = self
            .tenant_repo
            .create_membership(&mut *tx, user.id, invitation.tenant_id, invitation.role_id)
            .await?;

        tx.commit().await?;

        Ok(membership)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(tenant_id: Uuid) -> MembershipSummary {
        MembershipSummary {
            tenant_id,
            tenant_name: "Escola Aurora".into(),
            tenant_slug: "aurora".into(),
            role_name: "Professora".into(),
        }
    }

    #[test]
    fn zero_memberships_is_terminal() {
        assert_eq!(selection_outcome(&[]), SelectionOutcome::NoMemberships);
    }

    #[test]
    fn single_membership_auto_stamps_that_tenant() {
        let tenant_id = Uuid::new_v4();
        assert_eq!(
            selection_outcome(&[summary(tenant_id)]),
            SelectionOutcome::Single(tenant_id)
        );
    }

    #[test]
    fn multiple_memberships_require_explicit_choice() {
        let memberships = vec![summary(Uuid::new_v4()), summary(Uuid::new_v4())];
        assert_eq!(selection_outcome(&memberships), SelectionOutcome::Multiple);
    }
}
