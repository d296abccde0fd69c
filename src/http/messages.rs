//! Response texts shown to shop users.

pub const NOT_FOUND: &str = "Not Found";
pub const UNAUTHORIZED: &str = "Unauthorized";
pub const FORBIDDEN: &str = "У пользователя недостаточно прав";
pub const STATUS_REJECTED: &str = "Не получилось сменить статус заказа";
pub const INTERNAL: &str = "Internal Server Error";

pub const LOGGED_IN: &str = "Пользователь вошел в систему!";
pub const LOGGED_OUT: &str = "Пользователь вышел из системы!";

pub const CATEGORY_DELETED: &str = "Категория была удалена";
pub const PRODUCT_UPDATED: &str = "Товар был изменен";
pub const PRODUCT_DELETED: &str = "Товар был удален";

pub const LINE_CREATED: &str = "Запись была создана";
pub const LINE_UPDATED: &str = "Запись была обновлена";
pub const LINE_DELETED: &str = "Запись была удалена";

pub const STATUS_CHANGED: &str = "Статус заказа был изменен";

pub fn category_created(title: &str) -> String { format!("Категория {title} успешно создана") }

pub fn product_created(title: &str) -> String { format!("Товар {title} успешно создан") }
