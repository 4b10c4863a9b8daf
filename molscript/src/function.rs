//! # 脚本函数
//!
//! `function name(params) ... end function` 编译出的函数，以及两级注册表：
//!
//! - 本地注册表：名字以 `_` 开头的函数，归属单个 [`Compiler`](crate::Compiler)
//! - 共享注册表：其余函数，多个编译器实例共用，内部加锁
//!
//! 函数名大小写不敏感。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::table::CommandTable;

/// 本地函数名前缀
pub const LOCAL_PREFIX: char = '_';

/// 名字是否属于本地注册表
pub fn is_local_name(name: &str) -> bool {
    name.starts_with(LOCAL_PREFIX)
}

/// 编译好的函数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptFunction {
    pub name: String,
    pub params: Vec<String>,
    /// 函数体，下标从 0 开始
    pub body: CommandTable,
    /// 定义所在的脚本
    pub script_id: String,
}

impl ScriptFunction {
    pub fn is_local(&self) -> bool {
        is_local_name(&self.name)
    }
}

type FunctionMap = HashMap<String, Arc<ScriptFunction>>;

/// 共享函数注册表句柄
///
/// 克隆得到的是同一个注册表。
#[derive(Debug, Clone, Default)]
pub struct SharedFunctions {
    inner: Arc<Mutex<FunctionMap>>,
}

impl SharedFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FunctionMap> {
        // 持锁期间不会 panic，中毒时数据仍然完整
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, name: &str) -> Option<Arc<ScriptFunction>> {
        self.lock().get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(&name.to_lowercase())
    }

    /// 注册函数，返回被替换的旧定义
    pub fn insert(&self, function: ScriptFunction) -> Option<Arc<ScriptFunction>> {
        let key = function.name.to_lowercase();
        self.lock().insert(key, Arc::new(function))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// 编译器持有的函数注册表
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    local: FunctionMap,
    shared: SharedFunctions,
}

impl FunctionRegistry {
    pub fn new(shared: SharedFunctions) -> Self {
        Self {
            local: HashMap::new(),
            shared,
        }
    }

    pub fn shared(&self) -> &SharedFunctions {
        &self.shared
    }

    /// 按名字前缀选择注册表并注册，返回是否替换了已有定义
    pub fn register(&mut self, function: ScriptFunction) -> bool {
        if function.is_local() {
            let key = function.name.to_lowercase();
            self.local.insert(key, Arc::new(function)).is_some()
        } else {
            self.shared.insert(function).is_some()
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ScriptFunction>> {
        if is_local_name(name) {
            self.local.get(&name.to_lowercase()).cloned()
        } else {
            self.shared.get(name)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        if is_local_name(name) {
            self.local.contains_key(&name.to_lowercase())
        } else {
            self.shared.contains(name)
        }
    }

    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    /// 清空本地注册表
    pub fn clear_local(&mut self) {
        self.local.clear();
    }
}
