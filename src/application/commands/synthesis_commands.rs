//! Synthesis Commands - 合成任务编排

use uuid::Uuid;

/// 启动书籍合成命令
///
/// 为每个尚无成品音频的句子创建待合成单元并建立任务（可续传：
/// 已完成的句子不会重复排队）。
#[derive(Debug, Clone)]
pub struct StartSynthesis {
    pub book_id: Uuid,
}

/// 取消合成任务命令（协作式：停止发放新认领，在途单元不中断）
#[derive(Debug, Clone)]
pub struct CancelSynthesis {
    pub task_id: Uuid,
}

/// 重提交失败单元命令
///
/// 将书内 failed 状态的音频单元重置为 pending（retry_count + 1），
/// 并以新任务重新排队。
#[derive(Debug, Clone)]
pub struct ResubmitFailed {
    pub book_id: Uuid,
}
