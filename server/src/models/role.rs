//! Role registry
//!
//! Append-only role grants per wallet address. `assign` is idempotent on
//! (address, role); revocation is not an operation here. Authorization
//! code always re-reads this table rather than trusting token claims.

use diesel::prelude::*;
use peerlock_types::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::now_rfc3339;
use crate::schema::role_assignments;

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = role_assignments)]
pub struct RoleAssignment {
    pub id: String,
    pub address: String,
    pub role: String,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = role_assignments)]
pub struct NewRoleAssignment {
    pub id: String,
    pub address: String,
    pub role: String,
    pub created_by: String,
    pub created_at: String,
}

impl RoleAssignment {
    /// All roles held by an address, oldest grant first.
    ///
    /// Expects the address already normalized to lowercase.
    pub fn roles_of(conn: &mut SqliteConnection, address: &str) -> QueryResult<Vec<Role>> {
        let rows: Vec<RoleAssignment> = role_assignments::table
            .filter(role_assignments::address.eq(address))
            .order(role_assignments::created_at.asc())
            .load(conn)?;

        // Unknown role strings are skipped rather than failing the read
        Ok(rows.iter().filter_map(|r| Role::from_str(&r.role)).collect())
    }

    pub fn has_role(conn: &mut SqliteConnection, address: &str, role: Role) -> QueryResult<bool> {
        use diesel::dsl::count_star;

        let count: i64 = role_assignments::table
            .filter(role_assignments::address.eq(address))
            .filter(role_assignments::role.eq(role.as_str()))
            .select(count_star())
            .first(conn)?;

        Ok(count > 0)
    }

    /// Grant a role. Re-granting an existing role updates `created_by`
    /// instead of duplicating the row.
    pub fn assign(
        conn: &mut SqliteConnection,
        address: &str,
        role: Role,
        granted_by: &str,
    ) -> QueryResult<RoleAssignment> {
        let record = NewRoleAssignment {
            id: Uuid::new_v4().to_string(),
            address: address.to_string(),
            role: role.as_str().to_string(),
            created_by: granted_by.to_string(),
            created_at: now_rfc3339(),
        };

        diesel::insert_into(role_assignments::table)
            .values(&record)
            .on_conflict((role_assignments::address, role_assignments::role))
            .do_update()
            .set(role_assignments::created_by.eq(granted_by))
            .execute(conn)?;

        role_assignments::table
            .filter(role_assignments::address.eq(address))
            .filter(role_assignments::role.eq(role.as_str()))
            .first(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[test]
    fn assign_and_read_back() {
        let pool = create_test_pool();
        let mut conn = pool.get().unwrap();

        RoleAssignment::assign(&mut conn, ALICE, Role::User, "system").unwrap();
        RoleAssignment::assign(&mut conn, ALICE, Role::Arbitrator, "0xadmin").unwrap();

        let roles = RoleAssignment::roles_of(&mut conn, ALICE).unwrap();
        assert_eq!(roles, vec![Role::User, Role::Arbitrator]);
        assert!(RoleAssignment::has_role(&mut conn, ALICE, Role::Arbitrator).unwrap());
        assert!(!RoleAssignment::has_role(&mut conn, ALICE, Role::Admin).unwrap());
    }

    #[test]
    fn assign_is_idempotent_and_updates_grantor() {
        let pool = create_test_pool();
        let mut conn = pool.get().unwrap();

        RoleAssignment::assign(&mut conn, ALICE, Role::User, "system").unwrap();
        let updated = RoleAssignment::assign(&mut conn, ALICE, Role::User, "0xadmin").unwrap();

        assert_eq!(updated.created_by, "0xadmin");
        let roles = RoleAssignment::roles_of(&mut conn, ALICE).unwrap();
        assert_eq!(roles.len(), 1);
    }

    #[test]
    fn unknown_address_has_no_roles() {
        let pool = create_test_pool();
        let mut conn = pool.get().unwrap();
        assert!(RoleAssignment::roles_of(&mut conn, "0xdead").unwrap().is_empty());
    }
}
