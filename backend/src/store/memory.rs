//! In-memory store used for development and tests

use axum::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{LoanRequestStore, LoanStore, MemberStore, RequestMutation, Store, StoreError};
use crate::loan::Loan;
use crate::loan_request::{LedgerChange, LoanRequest, LoanRequestStatus};
use crate::models::{Member, MemberRole};

/// Each request sits behind its own mutex so approvals on different requests
/// never contend, while approvals on the same request are serialized.
#[derive(Default)]
pub struct InMemoryStore {
    members: RwLock<HashMap<Uuid, Member>>,
    revoked_tokens: RwLock<HashMap<String, DateTime<Utc>>>,
    requests: RwLock<HashMap<Uuid, Arc<Mutex<LoanRequest>>>>,
    loans: RwLock<HashMap<Uuid, Loan>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemberStore for InMemoryStore {
    async fn insert_member(&self, member: Member) -> Result<Member, StoreError> {
        let mut members = self.members.write().await;
        if members
            .values()
            .any(|m| m.email.eq_ignore_ascii_case(&member.email))
        {
            return Err(StoreError::Duplicate(format!(
                "member with e-mail {} already exists",
                member.email
            )));
        }
        members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, StoreError> {
        Ok(self.members.read().await.get(&id).cloned())
    }

    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, StoreError> {
        Ok(self
            .members
            .read()
            .await
            .values()
            .find(|m| m.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_members(&self) -> Result<Vec<Member>, StoreError> {
        let mut members: Vec<Member> = self.members.read().await.values().cloned().collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(members)
    }

    async fn update_member_role(&self, id: Uuid, role: MemberRole) -> Result<Member, StoreError> {
        let mut members = self.members.write().await;
        let member = members.get_mut(&id).ok_or(StoreError::NotFound)?;
        member.role = role;
        Ok(member.clone())
    }

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut revoked = self.revoked_tokens.write().await;
        let now = Utc::now();
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        Ok(self.revoked_tokens.read().await.contains_key(jti))
    }
}

#[async_trait]
impl LoanRequestStore for InMemoryStore {
    async fn insert_request(&self, request: LoanRequest) -> Result<LoanRequest, StoreError> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(StoreError::Duplicate(format!("loan request {}", request.id)));
        }
        requests.insert(request.id, Arc::new(Mutex::new(request.clone())));
        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<LoanRequest>, StoreError> {
        let entry = self.requests.read().await.get(&id).cloned();
        match entry {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_requests(
        &self,
        status: Option<LoanRequestStatus>,
        member_id: Option<Uuid>,
    ) -> Result<Vec<LoanRequest>, StoreError> {
        let entries: Vec<Arc<Mutex<LoanRequest>>> =
            self.requests.read().await.values().cloned().collect();

        let mut found = Vec::with_capacity(entries.len());
        for entry in entries {
            let request = entry.lock().await;
            if status.map_or(true, |s| request.status() == s)
                && member_id.map_or(true, |m| request.member_id == m)
            {
                found.push(request.clone());
            }
        }
        Ok(found)
    }

    async fn mutate_request(
        &self,
        id: Uuid,
        mutation: RequestMutation<'_>,
    ) -> Result<(LoanRequest, LedgerChange), StoreError> {
        let entry = self
            .requests
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        let mut current = entry.lock().await;
        let mut working = current.clone();
        let change = mutation(&mut working)?;
        if let LedgerChange::Applied { .. } = change {
            *current = working;
        }
        Ok((current.clone(), change))
    }
}

#[async_trait]
impl LoanStore for InMemoryStore {
    async fn insert_loan(&self, loan: Loan) -> Result<Loan, StoreError> {
        let mut loans = self.loans.write().await;
        if loans
            .values()
            .any(|l| l.loan_request_id == loan.loan_request_id)
        {
            return Err(StoreError::Duplicate(format!(
                "loan for request {} already exists",
                loan.loan_request_id
            )));
        }
        loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn find_loan(&self, id: Uuid) -> Result<Option<Loan>, StoreError> {
        Ok(self.loans.read().await.get(&id).cloned())
    }

    async fn find_loan_by_request(
        &self,
        loan_request_id: Uuid,
    ) -> Result<Option<Loan>, StoreError> {
        Ok(self
            .loans
            .read()
            .await
            .values()
            .find(|l| l.loan_request_id == loan_request_id)
            .cloned())
    }

    async fn list_loans(&self, member_id: Option<Uuid>) -> Result<Vec<Loan>, StoreError> {
        let mut loans: Vec<Loan> = self
            .loans
            .read()
            .await
            .values()
            .filter(|l| member_id.map_or(true, |m| l.member_id == m))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.begin_date.cmp(&a.begin_date).then(a.id.cmp(&b.id)));
        Ok(loans)
    }

    async fn mark_loan_repaid(&self, id: Uuid, at: DateTime<Utc>) -> Result<Loan, StoreError> {
        let mut loans = self.loans.write().await;
        let loan = loans.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !loan.is_repaid {
            loan.is_repaid = true;
            loan.repaid_at = Some(at);
        }
        Ok(loan.clone())
    }
}

impl Store for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan_request::ApproverRole;

    fn sample_request() -> LoanRequest {
        LoanRequest::new(Uuid::new_v4(), 80_000, "Tools".to_string(), 4, Utc::now())
    }

    #[tokio::test]
    async fn test_failed_mutation_writes_nothing() {
        let store = InMemoryStore::new();
        let request = store.insert_request(sample_request()).await.unwrap();

        let result = store
            .mutate_request(
                request.id,
                Box::new(|r: &mut LoanRequest| r.reject(ApproverRole::President, "", Utc::now())),
            )
            .await;

        assert!(matches!(result, Err(StoreError::Ledger(_))));
        let stored = store.find_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored, request);
    }

    #[tokio::test]
    async fn test_mutate_unknown_request() {
        let store = InMemoryStore::new();
        let result = store
            .mutate_request(
                Uuid::new_v4(),
                Box::new(|r: &mut LoanRequest| r.approve(ApproverRole::President, None, Utc::now())),
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_filters_by_member_and_status() {
        let store = InMemoryStore::new();
        let mine = store.insert_request(sample_request()).await.unwrap();
        store.insert_request(sample_request()).await.unwrap();
        store
            .mutate_request(
                mine.id,
                Box::new(|r: &mut LoanRequest| r.approve(ApproverRole::Treasurer, None, Utc::now())),
            )
            .await
            .unwrap();

        let by_member = store.list_requests(None, Some(mine.member_id)).await.unwrap();
        assert_eq!(by_member.len(), 1);

        let in_review = store
            .list_requests(Some(LoanRequestStatus::InReview), None)
            .await
            .unwrap();
        assert_eq!(in_review.len(), 1);
        assert_eq!(in_review[0].id, mine.id);
    }
}
