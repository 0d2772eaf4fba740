/// @see https://docs.mongodb.com/manual/reference/mongodb-wire-protocol/#request-opcodes
pub const MONGO_OP_REPLY_CODE: i32 = 1;
pub const MONGO_OP_UPDATE_CODE: i32 = 2001;
pub const MONGO_OP_INSERT_CODE: i32 = 2002;
pub const MONGO_OP_QUERY_CODE: i32 = 2004;
pub const MONGO_OP_GET_MORE_CODE: i32 = 2005;
pub const MONGO_OP_DELETE_CODE: i32 = 2006;
pub const MONGO_OP_KILL_CURSORS_CODE: i32 = 2007;
pub const MONGO_OP_COMMAND_CODE: i32 = 2010;
pub const MONGO_OP_COMMAND_REPLY_CODE: i32 = 2011;
pub const MONGO_OP_COMPRESSED_CODE: i32 = 2012;
pub const MONGO_OP_MSG_CODE: i32 = 2013;

/// Opcodes this server decodes. Everything else, including the write and
/// OP_MSG families, is carried as `Unknown` with its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MongoOpCode {
    OpReply,
    OpQuery,
    OpGetMore,
    OpKillCursors,
    Unknown(i32),
}

impl MongoOpCode {
    pub fn code(&self) -> i32 {
        match self {
            MongoOpCode::OpReply => MONGO_OP_REPLY_CODE,
            MongoOpCode::OpQuery => MONGO_OP_QUERY_CODE,
            MongoOpCode::OpGetMore => MONGO_OP_GET_MORE_CODE,
            MongoOpCode::OpKillCursors => MONGO_OP_KILL_CURSORS_CODE,
            MongoOpCode::Unknown(code) => *code,
        }
    }
}

pub fn pick_op_code(op: i32) -> MongoOpCode {
    match op {
        MONGO_OP_REPLY_CODE => MongoOpCode::OpReply,
        MONGO_OP_QUERY_CODE => MongoOpCode::OpQuery,
        MONGO_OP_GET_MORE_CODE => MongoOpCode::OpGetMore,
        MONGO_OP_KILL_CURSORS_CODE => MongoOpCode::OpKillCursors,
        _ => MongoOpCode::Unknown(op),
    }
}

#[cfg(test)]
mod opcodes_tests {
    use crate::cortices::mongo::ops::opcodes::{
        pick_op_code, MongoOpCode, MONGO_OP_KILL_CURSORS_CODE, MONGO_OP_MSG_CODE,
        MONGO_OP_QUERY_CODE, MONGO_OP_UPDATE_CODE,
    };

    #[test]
    fn test_pick_op_code() {
        assert_eq!(pick_op_code(MONGO_OP_QUERY_CODE), MongoOpCode::OpQuery);
        assert_eq!(pick_op_code(2005), MongoOpCode::OpGetMore);
        assert_eq!(pick_op_code(1), MongoOpCode::OpReply);
    }

    #[test]
    fn test_kill_cursors_is_not_update() {
        let op_code = pick_op_code(MONGO_OP_KILL_CURSORS_CODE);
        assert_eq!(op_code, MongoOpCode::OpKillCursors);
        assert_ne!(op_code.code(), MONGO_OP_UPDATE_CODE);
    }

    #[test]
    fn test_unsupported_op_codes_keep_their_value() {
        for code in &[MONGO_OP_UPDATE_CODE, MONGO_OP_MSG_CODE, 0, -7, 9999] {
            let op_code = pick_op_code(*code);
            assert_eq!(op_code, MongoOpCode::Unknown(*code));
            assert_eq!(op_code.code(), *code);
        }
    }
}
