//! 命令与参数定义

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::models::Role;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 登录（只记录邮箱和角色）
    Login(LoginArgs),

    /// 退出登录
    Logout,

    /// 管理参考答案
    #[command(subcommand)]
    Reference(ReferenceCommand),

    /// 评估一份 PDF 答卷
    Evaluate(EvaluateArgs),

    /// 列出全部评估记录
    Report,

    /// 按姓名查询成绩
    Lookup(LookupArgs),

    /// 导出 CSV 报表
    Export(ExportArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    Teacher,
    Student,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Teacher => Role::Teacher,
            RoleArg::Student => Role::Student,
        }
    }
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, value_enum)]
    pub role: RoleArg,
}

#[derive(Subcommand, Debug)]
pub enum ReferenceCommand {
    /// 保存参考答案（覆盖旧值）
    Set(ReferenceSetArgs),
    /// 显示当前参考答案
    Show,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ReferenceSetArgs {
    /// 直接给出参考答案文本
    #[arg(long)]
    pub text: Option<String>,

    /// 从文本文件读取参考答案
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// 答卷 PDF 路径
    #[arg(long)]
    pub pdf: PathBuf,

    /// 学生姓 (nom)
    #[arg(long)]
    pub last: String,

    /// 学生名 (prénom)
    #[arg(long)]
    pub first: String,

    /// 学生编号，留空时自动生成
    #[arg(long)]
    pub student_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    #[arg(long)]
    pub last: Option<String>,

    #[arg(long)]
    pub first: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// 输出路径，默认 rapport_<日期>.csv
    #[arg(long)]
    pub output: Option<PathBuf>,
}
