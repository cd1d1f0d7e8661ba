pub mod entity;
pub mod mapper;
pub mod memory_repo;
pub mod migrations;
pub mod sea_orm_repo;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::repo::Storage;
use memory_repo::MemoryRepository;
use sea_orm_repo::SeaOrmRepository;

/// Process-local storage; contents are lost on restart.
pub fn in_memory() -> Storage {
    Storage {
        users: Arc::new(MemoryRepository::new()),
        branches: Arc::new(MemoryRepository::new()),
        courses: Arc::new(MemoryRepository::new()),
        employees: Arc::new(MemoryRepository::new()),
        batches: Arc::new(MemoryRepository::new()),
        students: Arc::new(MemoryRepository::new()),
        enrollments: Arc::new(MemoryRepository::new()),
        attendance: Arc::new(MemoryRepository::new()),
        payments: Arc::new(MemoryRepository::new()),
        payrolls: Arc::new(MemoryRepository::new()),
        messages: Arc::new(MemoryRepository::new()),
    }
}

/// SeaORM-backed storage over a migrated connection.
pub fn sea_orm(conn: DatabaseConnection) -> Storage {
    Storage {
        users: Arc::new(SeaOrmRepository::new(conn.clone())),
        branches: Arc::new(SeaOrmRepository::new(conn.clone())),
        courses: Arc::new(SeaOrmRepository::new(conn.clone())),
        employees: Arc::new(SeaOrmRepository::new(conn.clone())),
        batches: Arc::new(SeaOrmRepository::new(conn.clone())),
        students: Arc::new(SeaOrmRepository::new(conn.clone())),
        enrollments: Arc::new(SeaOrmRepository::new(conn.clone())),
        attendance: Arc::new(SeaOrmRepository::new(conn.clone())),
        payments: Arc::new(SeaOrmRepository::new(conn.clone())),
        payrolls: Arc::new(SeaOrmRepository::new(conn.clone())),
        messages: Arc::new(SeaOrmRepository::new(conn)),
    }
}
